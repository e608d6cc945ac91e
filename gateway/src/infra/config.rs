use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::shared::error::GatewayError;

pub const DEFAULT_CONFIG_PATH: &str = "config/voitta.yaml";
pub const DEFAULT_LOG_PATH: &str = "/tmp/voitta-gateway/server.log";

/// Sentinel url marking an endpoint slot reserved for other tooling.
const EXCLUDED_URL: &str = "canvas";
/// Urls starting with this marker are treated as commented out.
const COMMENT_MARKER: char = '#';

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GatewayConfig {
    /// Router backends, in discovery order.
    #[serde(default)]
    pub backends: Vec<BackendConfig>,
    /// OpenAPI-described endpoints bridged directly over HTTP.
    #[serde(default)]
    pub endpoints: BTreeMap<String, EndpointConfig>,
    pub log_path: Option<String>,
    pub metrics_addr: Option<String>,
    pub metrics_auth_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub name: String,
    #[serde(default)]
    pub transport: BackendTransport,
    // stdio
    pub command: Option<String>,
    pub args: Option<Vec<String>>,
    pub env: Option<BTreeMap<String, String>>,
    pub cwd: Option<String>,
    // network
    pub url: Option<String>,
    pub auth_token: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BackendTransport {
    #[default]
    Stdio,
    Sse,
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub url: String,
}

impl GatewayConfig {
    /// Load the configuration file. A missing or unparseable file aborts
    /// startup.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, GatewayError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|err| GatewayError::config_load(path, err.to_string()))?;
        serde_yaml::from_str(&contents)
            .map_err(|err| GatewayError::config_load(path, err.to_string()))
    }

    pub fn log_path(&self) -> PathBuf {
        PathBuf::from(self.log_path.as_deref().unwrap_or(DEFAULT_LOG_PATH))
    }

    /// Endpoints eligible for bridging; `canvas` placeholders and
    /// commented-out urls are skipped.
    pub fn active_endpoints(&self) -> impl Iterator<Item = (&String, &EndpointConfig)> {
        self.endpoints
            .iter()
            .filter(|(_, endpoint)| !endpoint.is_excluded())
    }
}

impl EndpointConfig {
    pub fn is_excluded(&self) -> bool {
        self.url == EXCLUDED_URL || self.url.starts_with(COMMENT_MARKER)
    }
}
