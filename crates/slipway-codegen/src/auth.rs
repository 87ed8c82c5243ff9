//! Auth middleware emission.
//!
//! Each auth mode contributes an `authorize(request, env)` function to the
//! generated module. Secret material (api-key hash, OAuth client secret)
//! is never embedded; it arrives through worker env bindings supplied at
//! deploy time.

use slipway_core::{AuthConfig, AuthMode};

use crate::error::{CodegenError, CodegenResult};
use crate::validator::js_string;

/// Env binding carrying the hex SHA-256 of the api key.
pub const API_KEY_HASH_BINDING: &str = "SLIPWAY_API_KEY_HASH";
/// Env binding carrying the OAuth client id.
pub const OAUTH_CLIENT_ID_BINDING: &str = "SLIPWAY_OAUTH_CLIENT_ID";
/// Env binding carrying the OAuth client secret.
pub const OAUTH_CLIENT_SECRET_BINDING: &str = "SLIPWAY_OAUTH_CLIENT_SECRET";

/// Emit the auth middleware block for the configured mode.
pub fn emit_auth_block(auth: &AuthConfig) -> CodegenResult<String> {
    match auth.mode {
        AuthMode::Public => Ok(PUBLIC_BLOCK.to_string()),
        AuthMode::ApiKey => {
            if auth.api_key_hash.is_none() {
                return Err(CodegenError::Config(
                    "auth mode api_key requires a stored api key hash".to_string(),
                ));
            }
            Ok(format!("{SHARED_HELPERS}{API_KEY_BLOCK}"))
        }
        AuthMode::Oauth => {
            let oauth = auth.oauth.as_ref().ok_or_else(|| {
                CodegenError::Config("auth mode oauth requires an oauth configuration".to_string())
            })?;
            if oauth.introspection_url.is_empty() {
                return Err(CodegenError::Config(
                    "oauth configuration is missing an introspection url".to_string(),
                ));
            }
            let scopes: Vec<String> = oauth.required_scopes.iter().map(|s| js_string(s)).collect();
            Ok(format!(
                "{SHARED_HELPERS}const INTROSPECTION_URL = {url};\nconst REQUIRED_SCOPES = [{scopes}];\n{OAUTH_BLOCK}",
                url = js_string(&oauth.introspection_url),
                scopes = scopes.join(", "),
            ))
        }
    }
}

const PUBLIC_BLOCK: &str = "\
async function authorize(request, env) {
  return null;
}
";

// Helpers shared by the api_key and oauth modes.
const SHARED_HELPERS: &str = "\
function timingSafeEqual(a, b) {
  if (a.length !== b.length) return false;
  let diff = 0;
  for (let i = 0; i < a.length; i++) {
    diff |= a.charCodeAt(i) ^ b.charCodeAt(i);
  }
  return diff === 0;
}

async function sha256Hex(value) {
  const data = new TextEncoder().encode(value);
  const digest = await crypto.subtle.digest(\"SHA-256\", data);
  return Array.from(new Uint8Array(digest))
    .map((b) => b.toString(16).padStart(2, \"0\"))
    .join(\"\");
}

function unauthorized(message) {
  return json({ error: message }, 401);
}
";

const API_KEY_BLOCK: &str = "\
async function authorize(request, env) {
  const key = request.headers.get(\"x-api-key\");
  if (!key) return unauthorized(\"missing api key\");
  const digest = await sha256Hex(key);
  if (!timingSafeEqual(digest, env.SLIPWAY_API_KEY_HASH || \"\")) {
    return unauthorized(\"invalid api key\");
  }
  return null;
}
";

const OAUTH_BLOCK: &str = "\
async function introspectToken(token, env) {
  const body = new URLSearchParams({ token });
  const credentials = btoa(`${env.SLIPWAY_OAUTH_CLIENT_ID}:${env.SLIPWAY_OAUTH_CLIENT_SECRET}`);
  const response = await fetch(INTROSPECTION_URL, {
    method: \"POST\",
    headers: {
      \"content-type\": \"application/x-www-form-urlencoded\",
      authorization: `Basic ${credentials}`,
    },
    body,
  });
  if (!response.ok) return { active: false };
  return response.json();
}

function scopesSatisfied(granted, required) {
  const held = new Set((granted || \"\").split(\" \").filter(Boolean));
  return required.every((scope) => held.has(scope));
}

async function authorize(request, env) {
  const header = request.headers.get(\"authorization\") || \"\";
  if (!header.startsWith(\"Bearer \")) return unauthorized(\"missing bearer token\");
  const token = header.slice(7);
  const info = await introspectToken(token, env);
  if (!info.active) return unauthorized(\"token is not active\");
  if (!scopesSatisfied(info.scope, REQUIRED_SCOPES)) {
    return unauthorized(\"insufficient scope\");
  }
  return null;
}
";
