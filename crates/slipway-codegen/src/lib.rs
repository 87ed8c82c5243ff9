//! slipway-codegen — compiles a service definition into worker source.
//!
//! The generator takes a [`ServiceConfig`] snapshot (tools + bindings +
//! auth mode) and emits one self-contained JavaScript module:
//!
//! ```text
//! header        module comment, zod import, service/version constants
//! runtime       tool table, registerTool, json() helper
//! per tool      handler function + schema constant
//! registration  one registerTool(...) per tool, in input order
//! auth          authorize(request, env) + mode-specific helpers
//! entry         export default { fetch } dispatching /tools/{name}
//! ```
//!
//! Output is deterministic: identical input yields byte-identical source.
//! Nothing clock- or randomness-derived is ever embedded.

pub mod auth;
pub mod error;
pub mod handler;
pub mod ident;
pub mod validator;

pub use error::{CodegenError, CodegenResult};

use std::collections::HashSet;

use slipway_core::{AuthConfig, ServiceConfig, ToolDefinition};

use crate::handler::extract_handler_body;
use crate::ident::sanitize_ident;
use crate::validator::{compile_object, js_string};

/// Everything the generator needs to emit one deployable module.
#[derive(Debug, Clone)]
pub struct GeneratorInput<'a> {
    pub service_name: &'a str,
    pub version: &'a str,
    pub config: &'a ServiceConfig,
    pub auth: &'a AuthConfig,
}

/// Generate the full worker module for a service version.
pub fn generate(input: &GeneratorInput<'_>) -> CodegenResult<String> {
    if input.service_name.trim().is_empty() {
        return Err(CodegenError::Config("service name is missing".to_string()));
    }
    if input.version.trim().is_empty() {
        return Err(CodegenError::Config("version is missing".to_string()));
    }
    if input.config.auth_mode != input.auth.mode {
        return Err(CodegenError::Config(format!(
            "auth mode mismatch: config says {}, stored auth says {}",
            input.config.auth_mode.as_str(),
            input.auth.mode.as_str()
        )));
    }

    let mut seen = HashSet::new();
    for tool in &input.config.tools {
        if tool.name.trim().is_empty() {
            return Err(CodegenError::Config("tool with empty name".to_string()));
        }
        if !seen.insert(tool.name.as_str()) {
            return Err(CodegenError::Config(format!(
                "duplicate tool name: {}",
                tool.name
            )));
        }
    }

    let mut out = String::new();
    out.push_str(&emit_header(input));
    out.push_str(RUNTIME_PREAMBLE);

    for tool in &input.config.tools {
        out.push_str(&emit_tool(tool));
    }
    for tool in &input.config.tools {
        out.push_str(&emit_registration(tool));
    }
    out.push('\n');

    out.push_str(&auth::emit_auth_block(input.auth)?);
    out.push_str(FETCH_ENTRY);
    Ok(out)
}

fn emit_header(input: &GeneratorInput<'_>) -> String {
    format!(
        "// Generated worker for {name} v{version}. Do not edit by hand.\n\
         import {{ z }} from \"zod\";\n\n\
         const SLIPWAY_SERVICE = {name_lit};\n\
         const SLIPWAY_VERSION = {version_lit};\n\n",
        name = input.service_name,
        version = input.version,
        name_lit = js_string(input.service_name),
        version_lit = js_string(input.version),
    )
}

const RUNTIME_PREAMBLE: &str = "\
const __tools = new Map();

function registerTool(name, schema, handler) {
  __tools.set(name, { schema, handler });
}

function json(data, status = 200) {
  return new Response(JSON.stringify(data), {
    status,
    headers: { \"content-type\": \"application/json\" },
  });
}

";

/// One handler definition plus one schema definition per tool.
fn emit_tool(tool: &ToolDefinition) -> String {
    let ident = sanitize_ident(&tool.name);
    let body = indent(&extract_handler_body(&tool.handler_source), "  ");
    let schema = compile_object(&tool.input);
    let mut out = String::new();
    if !tool.description.is_empty() {
        out.push_str(&format!("// {}\n", tool.description.replace('\n', " ")));
    }
    out.push_str(&format!(
        "async function __handler_{ident}(input, env) {{\n{body}\n}}\n\
         const __schema_{ident} = {schema};\n\n"
    ));
    out
}

/// Tools register under their original name; only identifiers are sanitized.
fn emit_registration(tool: &ToolDefinition) -> String {
    let ident = sanitize_ident(&tool.name);
    format!(
        "registerTool({name}, __schema_{ident}, __handler_{ident});\n",
        name = js_string(&tool.name),
    )
}

const FETCH_ENTRY: &str = "\
export default {
  async fetch(request, env, ctx) {
    const denied = await authorize(request, env);
    if (denied) return denied;

    const url = new URL(request.url);
    if (request.method !== \"POST\" || !url.pathname.startsWith(\"/tools/\")) {
      return json({ error: \"not found\" }, 404);
    }
    const name = decodeURIComponent(url.pathname.slice(\"/tools/\".length));
    const tool = __tools.get(name);
    if (!tool) return json({ error: `unknown tool: ${name}` }, 404);

    const payload = await request.json().catch(() => null);
    const parsed = tool.schema.safeParse(payload ?? {});
    if (!parsed.success) {
      return json({ error: \"invalid input\", issues: parsed.error.issues }, 400);
    }
    const result = await tool.handler(parsed.data, env);
    return json({ service: SLIPWAY_SERVICE, version: SLIPWAY_VERSION, result });
  },
};
";

fn indent(body: &str, prefix: &str) -> String {
    body.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{prefix}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
