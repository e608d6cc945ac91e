use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the gateway.
///
/// `ConfigLoad` and `RouterInit` are fatal and abort startup; the remaining
/// variants are recovered at the dispatch boundary and rendered as
/// tool-error text content for the caller.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("failed to load configuration from {path}: {reason}")]
    ConfigLoad { path: PathBuf, reason: String },

    #[error("router initialization failed: {0}")]
    RouterInit(String),

    #[error("tool {0} not found")]
    ToolNotFound(String),

    #[error("{0}")]
    ToolInvocation(String),

    #[error("endpoint '{name}' initialization failed: {reason}")]
    EndpointInit { name: String, reason: String },
}

impl GatewayError {
    pub fn config_load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ConfigLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn invocation(reason: impl Into<String>) -> Self {
        Self::ToolInvocation(reason.into())
    }
}
