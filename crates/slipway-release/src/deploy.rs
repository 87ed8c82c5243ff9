//! Deploy API port — the hosting platform as a black-box capability.
//!
//! `deploy` is an idempotent upsert by worker name; `endpoint_for` resolves
//! the public URL of a deployed worker. The HTTP implementation targets the
//! platform's management API; tests plug in scripted implementations.

use async_trait::async_trait;
use thiserror::Error;

use slipway_codegen::auth::{
    API_KEY_HASH_BINDING, OAUTH_CLIENT_ID_BINDING, OAUTH_CLIENT_SECRET_BINDING,
};
use slipway_core::{AuthConfig, AuthMode, BindingSet};

/// A deploy call rejected or failed by the platform.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct DeployFailure(pub String);

/// Everything the platform needs to run one worker.
#[derive(Debug, Clone, PartialEq)]
pub struct DeployRequest {
    pub worker_name: String,
    pub source: String,
    pub bindings: BindingSet,
    /// Secret env bindings, name → value.
    pub secrets: Vec<(String, String)>,
}

#[async_trait]
pub trait DeployApi: Send + Sync {
    /// Idempotent upsert of a worker by name.
    async fn deploy(&self, request: &DeployRequest) -> Result<(), DeployFailure>;

    /// Public endpoint of a deployed worker.
    async fn endpoint_for(&self, worker_name: &str) -> Result<String, DeployFailure>;
}

/// Deterministic worker name for a service version:
/// `slipway-{service}-{version}` with everything outside `[a-z0-9-]`
/// flattened to `-`.
pub fn worker_name(service_id: &str, version: &str) -> String {
    let clean = |s: &str| -> String {
        s.chars()
            .map(|c| {
                let c = c.to_ascii_lowercase();
                if c.is_ascii_alphanumeric() { c } else { '-' }
            })
            .collect()
    };
    format!("slipway-{}-{}", clean(service_id), clean(version))
}

/// Secret env bindings derived from a service's stored auth config.
///
/// Only secret material travels here; non-secret auth values (introspection
/// URL, required scopes) are already part of the generated source.
pub fn secrets_for(auth: &AuthConfig) -> Vec<(String, String)> {
    match auth.mode {
        AuthMode::Public => Vec::new(),
        AuthMode::ApiKey => auth
            .api_key_hash
            .iter()
            .map(|hash| (API_KEY_HASH_BINDING.to_string(), hash.clone()))
            .collect(),
        AuthMode::Oauth => match &auth.oauth {
            Some(oauth) => vec![
                (OAUTH_CLIENT_ID_BINDING.to_string(), oauth.client_id.clone()),
                (
                    OAUTH_CLIENT_SECRET_BINDING.to_string(),
                    oauth.client_secret.clone(),
                ),
            ],
            None => Vec::new(),
        },
    }
}

// ── HTTP implementation ────────────────────────────────────────────

/// Deploy API client over the platform's HTTP management surface.
pub struct HttpDeployApi {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl HttpDeployApi {
    pub fn new(base_url: &str, token: Option<&str>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
            client: reqwest::Client::new(),
        }
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

#[async_trait]
impl DeployApi for HttpDeployApi {
    async fn deploy(&self, request: &DeployRequest) -> Result<(), DeployFailure> {
        let url = format!("{}/workers/{}", self.base_url, request.worker_name);
        let body = serde_json::json!({
            "source": request.source,
            "bindings": request.bindings,
            "secrets": request
                .secrets
                .iter()
                .map(|(name, value)| serde_json::json!({"name": name, "value": value}))
                .collect::<Vec<_>>(),
        });

        let response = self
            .authorized(self.client.put(&url).json(&body))
            .send()
            .await
            .map_err(|e| DeployFailure(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(DeployFailure(format!(
                "platform returned {status}: {detail}"
            )));
        }
        Ok(())
    }

    async fn endpoint_for(&self, worker_name: &str) -> Result<String, DeployFailure> {
        let url = format!("{}/workers/{}/endpoint", self.base_url, worker_name);
        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(|e| DeployFailure(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DeployFailure(format!(
                "endpoint lookup returned {}",
                response.status()
            )));
        }

        #[derive(serde::Deserialize)]
        struct EndpointResponse {
            url: String,
        }
        let body: EndpointResponse = response
            .json()
            .await
            .map_err(|e| DeployFailure(e.to_string()))?;
        Ok(body.url)
    }
}
