//! Shared types used across Slipway crates.
//!
//! These describe what a service *is*: its callable tools with typed
//! parameter schemas, the external resources it binds to, and how callers
//! authenticate. A frozen [`ServiceConfig`] snapshot travels with every
//! published version so a rollback can regenerate the exact same worker.

use serde::{Deserialize, Serialize};

/// One callable capability of a service: a typed parameter schema plus the
/// handler source fragment that implements it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Top-level input parameters. Compiled into an object validator.
    #[serde(default)]
    pub input: Vec<Parameter>,
    /// Handler body, or a full function/arrow expression whose body is
    /// extracted at generation time.
    pub handler_source: String,
}

/// A named input parameter. Recursive through [`ParamSchema`] for arrays
/// and objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(flatten)]
    pub schema: ParamSchema,
}

/// Typed parameter schema with per-variant validation constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParamSchema {
    /// String with optional enum/pattern/length constraints.
    /// An enum short-circuits every other string constraint.
    String {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        enum_values: Option<Vec<String>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pattern: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_length: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_length: Option<u32>,
    },
    /// Number with optional bounds. `integer` switches the base validator.
    Number {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        minimum: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        maximum: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        multiple_of: Option<f64>,
        #[serde(default)]
        integer: bool,
    },
    Boolean,
    /// Homogeneous list. Uniqueness is enforced as a post-check.
    Array {
        items: Box<ParamSchema>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_items: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_items: Option<u32>,
        #[serde(default)]
        unique_items: bool,
    },
    /// Nested object with its own parameter list.
    Object { properties: Vec<Parameter> },
}

// ── Bindings ───────────────────────────────────────────────────────

/// A declared attachment to one external resource, optionally paired with
/// a concrete resource id known to the hosting platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
}

/// External resource attachments a deployed worker needs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BindingSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<Binding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kv_namespace: Option<Binding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_store: Option<Binding>,
    /// Secret names resolved by the platform at deploy time.
    #[serde(default)]
    pub secrets: Vec<String>,
}

impl BindingSet {
    /// Merge a version snapshot over the service's current bindings.
    ///
    /// Snapshot entries win per binding name; secrets are the union with
    /// snapshot entries first.
    pub fn merged_over(&self, current: &BindingSet) -> BindingSet {
        let mut secrets = self.secrets.clone();
        for s in &current.secrets {
            if !secrets.contains(s) {
                secrets.push(s.clone());
            }
        }
        BindingSet {
            database: self.database.clone().or_else(|| current.database.clone()),
            kv_namespace: self
                .kv_namespace
                .clone()
                .or_else(|| current.kv_namespace.clone()),
            object_store: self
                .object_store
                .clone()
                .or_else(|| current.object_store.clone()),
            secrets,
        }
    }
}

// ── Auth ───────────────────────────────────────────────────────────

/// How callers authenticate against a deployed service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    Public,
    ApiKey,
    Oauth,
}

impl AuthMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMode::Public => "public",
            AuthMode::ApiKey => "api_key",
            AuthMode::Oauth => "oauth",
        }
    }
}

/// OAuth introspection settings for `AuthMode::Oauth` services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OAuthConfig {
    pub provider: String,
    pub client_id: String,
    pub client_secret: String,
    pub introspection_url: String,
    #[serde(default)]
    pub required_scopes: Vec<String>,
}

/// Stored auth configuration for a service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    pub mode: AuthMode,
    /// Hex SHA-256 of the api key. Only set for `AuthMode::ApiKey`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth: Option<OAuthConfig>,
}

impl AuthConfig {
    pub fn public() -> Self {
        Self {
            mode: AuthMode::Public,
            api_key_hash: None,
            oauth: None,
        }
    }
}

// ── Config snapshot ────────────────────────────────────────────────

/// The full declarative definition frozen into a service version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub tools: Vec<ToolDefinition>,
    #[serde(default)]
    pub bindings: BindingSet,
    pub auth_mode: AuthMode,
}

impl ServiceConfig {
    /// Canonical JSON bytes of this snapshot. Used as bundle content so
    /// identical configs hash to identical bundle keys.
    pub fn canonical_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(name: &str) -> Binding {
        Binding {
            name: name.to_string(),
            resource_id: Some(format!("{name}-id")),
        }
    }

    #[test]
    fn param_schema_roundtrip() {
        let schema = ParamSchema::Array {
            items: Box::new(ParamSchema::String {
                enum_values: Some(vec!["a".into(), "b".into()]),
                pattern: None,
                min_length: None,
                max_length: None,
            }),
            min_items: Some(1),
            max_items: Some(5),
            unique_items: true,
        };
        let json = serde_json::to_string(&schema).unwrap();
        assert!(json.contains("\"type\":\"array\""));
        let back: ParamSchema = serde_json::from_str(&json).unwrap();
        assert_eq!(back, schema);
    }

    #[test]
    fn parameter_flattens_schema_tag() {
        let param = Parameter {
            name: "city".to_string(),
            description: String::new(),
            required: true,
            schema: ParamSchema::String {
                enum_values: None,
                pattern: None,
                min_length: None,
                max_length: None,
            },
        };
        let json = serde_json::to_value(&param).unwrap();
        assert_eq!(json["type"], "string");
        assert_eq!(json["required"], true);
    }

    #[test]
    fn binding_merge_snapshot_wins() {
        let snapshot = BindingSet {
            database: Some(binding("DB_NEW")),
            kv_namespace: None,
            object_store: None,
            secrets: vec!["API_TOKEN".into()],
        };
        let current = BindingSet {
            database: Some(binding("DB_OLD")),
            kv_namespace: Some(binding("KV")),
            object_store: None,
            secrets: vec!["API_TOKEN".into(), "WEBHOOK_SECRET".into()],
        };

        let merged = snapshot.merged_over(&current);
        assert_eq!(merged.database.unwrap().name, "DB_NEW");
        assert_eq!(merged.kv_namespace.unwrap().name, "KV");
        assert!(merged.object_store.is_none());
        assert_eq!(merged.secrets, vec!["API_TOKEN", "WEBHOOK_SECRET"]);
    }

    #[test]
    fn canonical_bytes_stable() {
        let config = ServiceConfig {
            tools: vec![],
            bindings: BindingSet::default(),
            auth_mode: AuthMode::Public,
        };
        assert_eq!(
            config.canonical_bytes().unwrap(),
            config.canonical_bytes().unwrap()
        );
    }
}
