//! Tool name sanitization for generated identifiers.

/// Prefix applied when a sanitized name would not be a legal identifier.
const IDENT_PREFIX: &str = "tool_";

/// Sanitize a tool name into a bare identifier.
///
/// Characters outside `[A-Za-z0-9_]` become `_`. If the result is empty or
/// starts with a digit, it is prefixed with `tool_`.
pub fn sanitize_ident(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            out.push(ch);
        } else {
            out.push('_');
        }
    }
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert_str(0, IDENT_PREFIX);
    }
    out
}
