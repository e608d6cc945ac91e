use reqwest::Client;

use crate::app::bridge;
use crate::app::registry::{GatewayRegistry, ToolBinding};
use crate::app::router::{McpToolRouter, ToolRouter};
use crate::infra::config::GatewayConfig;
use crate::infra::metrics;
use crate::shared::error::GatewayError;
use crate::shared::types::EndpointInfo;

/// Everything the server handler needs, built once at startup and read-only
/// afterwards.
pub struct GatewayState {
    pub registry: GatewayRegistry,
    pub router: Option<Box<dyn ToolRouter>>,
    pub endpoints: Vec<EndpointInfo>,
    pub http: Client,
}

impl GatewayState {
    /// Connect the router (fatal on failure), then bridge each configured
    /// endpoint in turn (a failing endpoint is logged and skipped), and
    /// freeze the registry.
    pub async fn initialize(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let http = Client::new();
        let mut registry = GatewayRegistry::default();

        let router: Option<Box<dyn ToolRouter>> = if config.backends.is_empty() {
            None
        } else {
            let router = match McpToolRouter::connect(&config.backends).await {
                Ok(router) => router,
                Err(err) => {
                    tracing::error!(%err, "router initialization failed");
                    return Err(err);
                }
            };
            for descriptor in router.descriptors() {
                registry.register(descriptor, ToolBinding::Router);
            }
            Some(Box::new(router))
        };

        let mut endpoints = Vec::new();
        for (name, endpoint) in config.active_endpoints() {
            match bridge::discover_endpoint(&http, name, &endpoint.url).await {
                Ok(discovered) => {
                    let mut tool_names = Vec::new();
                    for operation in discovered.operations {
                        tool_names.push(operation.descriptor.name.clone());
                        registry.register(
                            &operation.descriptor,
                            ToolBinding::Endpoint(operation.binding),
                        );
                    }
                    tracing::info!(endpoint = %name, tools = tool_names.len(), "endpoint bridged");
                    endpoints.push(EndpointInfo {
                        name: name.clone(),
                        url: endpoint.url.clone(),
                        prompt: discovered.prompt,
                        tools: tool_names,
                    });
                }
                Err(err) => {
                    let err = GatewayError::EndpointInit {
                        name: name.clone(),
                        reason: err.to_string(),
                    };
                    tracing::warn!(%err, "skipping endpoint");
                }
            }
        }

        metrics::REGISTERED_TOOLS.set(registry.len() as i64);
        Ok(Self {
            registry,
            router,
            endpoints,
            http,
        })
    }
}
