//! Handler fragment normalization.
//!
//! A tool's handler source may be a bare statement block or a full
//! function/arrow expression. Wrapped fragments have their body extracted
//! by balanced-brace scanning so the generator never emits a nested
//! function wrapper around the real body.

/// Normalize a handler fragment into statements for the generated handler
/// function body.
pub fn extract_handler_body(fragment: &str) -> String {
    let trimmed = fragment.trim();

    // `function name(params) { ... }` — skip the parameter list first so a
    // default value like `x = {}` cannot be mistaken for the body.
    if let Some(rest) = strip_function_head(trimmed)
        && let Some(open) = rest.find('(')
        && let Some(close) = matching_delim(&rest[open..], '(', ')')
        && let Some(body) = brace_delimited_body(&rest[open + close + 1..])
    {
        return body;
    }

    if let Some(rest) = strip_arrow_head(trimmed) {
        let rest = rest.trim_start();
        if rest.starts_with('{') {
            if let Some(body) = brace_delimited_body(rest) {
                return body;
            }
        } else if !rest.is_empty() {
            // Expression-bodied arrow: keep the expression, make the
            // return explicit.
            return format!("return ({});", rest.trim_end().trim_end_matches(';'));
        }
    }

    trimmed.to_string()
}

/// If the fragment starts with a (possibly async) function declaration or
/// expression, return the remainder after the `function` keyword.
fn strip_function_head(src: &str) -> Option<&str> {
    let src = src.strip_prefix("async").map_or(src, str::trim_start);
    let rest = src.strip_prefix("function")?;
    // `function` must be a whole keyword, not a prefix of an identifier.
    match rest.chars().next() {
        Some(c) if c.is_ascii_alphanumeric() || c == '_' => None,
        _ => Some(rest),
    }
}

/// If the fragment is an arrow function, return the slice after `=>`.
///
/// Recognizes `(a, b) => ...`, `ident => ...`, and their `async` forms.
fn strip_arrow_head(src: &str) -> Option<&str> {
    let src = src.strip_prefix("async").map_or(src, str::trim_start);

    let after_params = if src.starts_with('(') {
        let close = matching_delim(src, '(', ')')?;
        &src[close + 1..]
    } else {
        let end = src
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '$'))
            .unwrap_or(src.len());
        if end == 0 {
            return None;
        }
        &src[end..]
    };

    after_params.trim_start().strip_prefix("=>")
}

/// Extract the contents of the first balanced `{...}` block in `src`,
/// skipping string literals, template literals, and comments.
fn brace_delimited_body(src: &str) -> Option<String> {
    let open = scan_to_open_brace(src)?;
    let close = matching_delim(&src[open..], '{', '}')? + open;
    Some(src[open + 1..close].trim().to_string())
}

/// Index of the first `{` outside any string or comment.
fn scan_to_open_brace(src: &str) -> Option<usize> {
    let mut scanner = Scanner::default();
    for (i, ch) in src.char_indices() {
        if scanner.in_code() && ch == '{' {
            return Some(i);
        }
        scanner.advance(ch);
    }
    None
}

/// Byte index of the delimiter matching the first `open` in `src`,
/// skipping strings and comments.
fn matching_delim(src: &str, open: char, close: char) -> Option<usize> {
    let mut scanner = Scanner::default();
    let mut depth = 0u32;
    for (i, ch) in src.char_indices() {
        if scanner.in_code() {
            if ch == open {
                depth += 1;
            } else if ch == close && depth > 0 {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
        }
        scanner.advance(ch);
    }
    None
}

/// Minimal lexer state: enough to know whether a character is code or part
/// of a string/comment. Regex literals are not tracked.
#[derive(Default)]
struct Scanner {
    mode: Mode,
    escaped: bool,
    prev: Option<char>,
}

#[derive(Default, PartialEq)]
enum Mode {
    #[default]
    Code,
    Single,
    Double,
    Template,
    LineComment,
    BlockComment,
}

impl Scanner {
    fn in_code(&self) -> bool {
        self.mode == Mode::Code
    }

    fn advance(&mut self, ch: char) {
        if self.escaped {
            self.escaped = false;
            self.prev = Some(ch);
            return;
        }
        match self.mode {
            Mode::Code => match ch {
                '\'' => self.mode = Mode::Single,
                '"' => self.mode = Mode::Double,
                '`' => self.mode = Mode::Template,
                '/' if self.prev == Some('/') => self.mode = Mode::LineComment,
                '*' if self.prev == Some('/') => self.mode = Mode::BlockComment,
                _ => {}
            },
            Mode::Single => match ch {
                '\\' => self.escaped = true,
                '\'' => self.mode = Mode::Code,
                _ => {}
            },
            Mode::Double => match ch {
                '\\' => self.escaped = true,
                '"' => self.mode = Mode::Code,
                _ => {}
            },
            Mode::Template => match ch {
                '\\' => self.escaped = true,
                '`' => self.mode = Mode::Code,
                _ => {}
            },
            Mode::LineComment => {
                if ch == '\n' {
                    self.mode = Mode::Code;
                }
            }
            Mode::BlockComment => {
                if ch == '/' && self.prev == Some('*') {
                    self.mode = Mode::Code;
                }
            }
        }
        self.prev = Some(ch);
    }
}
