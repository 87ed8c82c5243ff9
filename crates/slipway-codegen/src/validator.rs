//! Parameter schema → validator chain compilation.
//!
//! Each [`ParamSchema`] compiles to one zod expression. The mapping is a
//! pure function so every constraint kind can be unit-tested in isolation.

use slipway_core::{ParamSchema, Parameter};

/// Compile a schema into a zod validator expression.
pub fn compile_schema(schema: &ParamSchema) -> String {
    match schema {
        ParamSchema::String {
            enum_values,
            pattern,
            min_length,
            max_length,
        } => {
            // An enum replaces the base validator and short-circuits every
            // other string constraint.
            if let Some(values) = enum_values
                && !values.is_empty()
            {
                let quoted: Vec<String> = values.iter().map(|v| js_string(v)).collect();
                return format!("z.enum([{}])", quoted.join(", "));
            }
            let mut out = String::from("z.string()");
            if let Some(p) = pattern {
                out.push_str(&format!(".regex(new RegExp({}))", js_string(p)));
            }
            if let Some(n) = min_length {
                out.push_str(&format!(".min({n})"));
            }
            if let Some(n) = max_length {
                out.push_str(&format!(".max({n})"));
            }
            out
        }

        ParamSchema::Number {
            minimum,
            maximum,
            multiple_of,
            integer,
        } => {
            let mut out = String::from("z.number()");
            if *integer {
                out.push_str(".int()");
            }
            if let Some(n) = minimum {
                out.push_str(&format!(".min({})", js_number(*n)));
            }
            if let Some(n) = maximum {
                out.push_str(&format!(".max({})", js_number(*n)));
            }
            if let Some(n) = multiple_of {
                out.push_str(&format!(".multipleOf({})", js_number(*n)));
            }
            out
        }

        ParamSchema::Boolean => String::from("z.boolean()"),

        ParamSchema::Array {
            items,
            min_items,
            max_items,
            unique_items,
        } => {
            let mut out = format!("z.array({})", compile_schema(items));
            if let Some(n) = min_items {
                out.push_str(&format!(".min({n})"));
            }
            if let Some(n) = max_items {
                out.push_str(&format!(".max({n})"));
            }
            // Uniqueness is a post-check over the parsed array, applied last.
            if *unique_items {
                out.push_str(
                    ".refine((xs) => new Set(xs.map((x) => JSON.stringify(x))).size === xs.length, \
                     { message: \"items must be unique\" })",
                );
            }
            out
        }

        ParamSchema::Object { properties } => compile_object(properties),
    }
}

/// Compile a parameter list into a `z.object({...})` validator.
///
/// Non-required properties get `.optional()` appended.
pub fn compile_object(properties: &[Parameter]) -> String {
    let mut fields = Vec::with_capacity(properties.len());
    for param in properties {
        let mut expr = compile_schema(&param.schema);
        if !param.required {
            expr.push_str(".optional()");
        }
        fields.push(format!("{}: {}", js_string(&param.name), expr));
    }
    format!("z.object({{ {} }})", fields.join(", "))
}

/// JSON-quote a string for embedding in generated source.
pub fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| String::from("\"\""))
}

/// Format a float without a trailing `.0` for whole numbers, matching how
/// the values would be written by hand.
fn js_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}
