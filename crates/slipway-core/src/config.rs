//! slipway.toml configuration parser.

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlipwayConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub deploy: DeployConfig,
    #[serde(default)]
    pub progress: ProgressConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub data_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8070,
            data_dir: "/var/lib/slipway".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployConfig {
    /// Base URL of the hosting platform's deploy API.
    pub base_url: String,
    /// Bearer token for the deploy API, if it requires one.
    pub token: Option<String>,
    /// Per-step timeout for external calls during a publish or rollback.
    pub step_timeout_secs: u64,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8787".to_string(),
            token: None,
            step_timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressConfig {
    /// Seconds between keepalive frames on live progress channels.
    pub keepalive_secs: u64,
    /// Maximum lifetime of a single subscriber session.
    pub max_session_secs: u64,
    /// How long a terminal broadcaster lingers for late subscribers.
    pub linger_secs: u64,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            keepalive_secs: 15,
            max_session_secs: 600,
            linger_secs: 300,
        }
    }
}

impl SlipwayConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SlipwayConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
