use rmcp::{ErrorData as McpError, ServerHandler, model::*};
use serde_json::Value;
use std::sync::Arc;

use crate::app::{dispatch, state::GatewayState};
use crate::shared::types::{EndpointInfoArgs, ToolInfoArgs};

pub const TOOLS_RESOURCE_URI: &str = "voitta://tools";
pub const ENDPOINTS_RESOURCE_URI: &str = "endpoints://list";

fn schema_for<T: rmcp::schemars::JsonSchema + 'static>() -> Arc<JsonObject> {
    rmcp::handler::server::common::cached_schema_for_type::<T>()
}

#[derive(Clone)]
pub struct GatewayServer {
    state: Arc<GatewayState>,
}

impl GatewayServer {
    pub fn new(state: Arc<GatewayState>) -> Self {
        Self { state }
    }

    fn info_tools() -> Vec<Tool> {
        use rmcp::handler::server::wrapper::Parameters;
        vec![
            Tool::new(
                "get_voitta_tool_info",
                "Describe a gateway tool, or list every registered tool.",
                schema_for::<Parameters<ToolInfoArgs>>(),
            ),
            Tool::new(
                "get_endpoint_info",
                "Describe a bridged endpoint, or list every configured endpoint.",
                schema_for::<Parameters<EndpointInfoArgs>>(),
            ),
        ]
    }

    fn tool_listing(&self) -> String {
        if self.state.registry.is_empty() {
            return "no tools registered".into();
        }
        self.state
            .registry
            .records()
            .iter()
            .map(|record| {
                format!(
                    "{} ({}): {}",
                    record.short_name, record.full_name, record.description
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn endpoint_listing(&self) -> String {
        if self.state.endpoints.is_empty() {
            return "no endpoints configured".into();
        }
        self.state
            .endpoints
            .iter()
            .map(|endpoint| {
                format!(
                    "{}: {} ({} tools)",
                    endpoint.name,
                    endpoint.url,
                    endpoint.tools.len()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn tool_info(&self, args: ToolInfoArgs) -> CallToolResult {
        match args.tool_name {
            Some(name) => match self.state.registry.resolve(&name) {
                Some(record) => {
                    let schema = serde_json::to_string_pretty(&Value::Object(
                        record.input_schema.clone(),
                    ))
                    .unwrap_or_default();
                    CallToolResult::success(vec![Content::text(format!(
                        "{} ({})\n{}\nschema:\n{}",
                        record.short_name, record.full_name, record.description, schema
                    ))])
                }
                None => CallToolResult::error(vec![Content::text(format!(
                    "Tool {name} not found"
                ))]),
            },
            None => CallToolResult::success(vec![Content::text(self.tool_listing())]),
        }
    }

    fn endpoint_info(&self, args: EndpointInfoArgs) -> CallToolResult {
        match args.name {
            Some(name) => match self
                .state
                .endpoints
                .iter()
                .find(|endpoint| endpoint.name == name)
            {
                Some(endpoint) => {
                    let mut lines = vec![
                        format!("{}: {}", endpoint.name, endpoint.url),
                        format!("tools: {}", endpoint.tools.join(", ")),
                    ];
                    if let Some(prompt) = &endpoint.prompt {
                        lines.push(format!("prompt: {prompt}"));
                    }
                    CallToolResult::success(vec![Content::text(lines.join("\n"))])
                }
                None => CallToolResult::error(vec![Content::text(format!(
                    "Endpoint {name} not found"
                ))]),
            },
            None => CallToolResult::success(vec![Content::text(self.endpoint_listing())]),
        }
    }
}

impl ServerHandler for GatewayServer {
    fn initialize(
        &self,
        request: InitializeRequestParam,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<InitializeResult, McpError>> + Send + '_ {
        tracing::info!(?request.client_info, %request.protocol_version, "initialize received");
        let capabilities = ServerCapabilities::builder()
            .enable_tools()
            .enable_resources()
            .build();
        let init = ServerInfo {
            // echo back the protocol requested by client for compatibility
            protocol_version: request.protocol_version,
            capabilities,
            server_info: Implementation {
                name: "voitta-gateway".into(),
                title: Some("Voitta MCP Gateway".into()),
                version: env!("CARGO_PKG_VERSION").into(),
                icons: None,
                website_url: None,
            },
            instructions: None,
        };
        async move { Ok(init) }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        let mut tools = Self::info_tools();
        tools.extend(self.state.registry.list());
        tracing::info!(count = tools.len(), "list_tools called");
        async move {
            Ok(ListToolsResult {
                tools,
                next_cursor: None,
            })
        }
    }

    fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        let this = self.clone();
        async move {
            tracing::info!(tool = %request.name, "call_tool received");
            let name = request.name.to_string();
            let arguments = request.arguments.unwrap_or_default();
            let result = match name.as_str() {
                "get_voitta_tool_info" => {
                    let args = serde_json::from_value::<ToolInfoArgs>(Value::Object(arguments))
                        .unwrap_or_default();
                    this.tool_info(args)
                }
                "get_endpoint_info" => {
                    let args =
                        serde_json::from_value::<EndpointInfoArgs>(Value::Object(arguments))
                            .unwrap_or_default();
                    this.endpoint_info(args)
                }
                _ => dispatch::dispatch_call(&this.state, &name, arguments).await,
            };
            Ok(result)
        }
    }

    fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListResourcesResult, McpError>> + Send + '_ {
        let mut tools = RawResource::new(TOOLS_RESOURCE_URI, "Registered tools");
        tools.description = Some("Human-readable list of every tool exposed by the gateway.".into());
        tools.mime_type = Some("text/plain".into());
        let mut endpoints = RawResource::new(ENDPOINTS_RESOURCE_URI, "Bridged endpoints");
        endpoints.description = Some("Configured endpoints and their tool counts.".into());
        endpoints.mime_type = Some("text/plain".into());
        async move {
            Ok(ListResourcesResult {
                resources: vec![tools.no_annotation(), endpoints.no_annotation()],
                next_cursor: None,
            })
        }
    }

    fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ReadResourceResult, McpError>> + Send + '_ {
        let result = match request.uri.as_str() {
            TOOLS_RESOURCE_URI => Ok(ReadResourceResult {
                contents: vec![ResourceContents::text(
                    self.tool_listing(),
                    TOOLS_RESOURCE_URI,
                )],
            }),
            ENDPOINTS_RESOURCE_URI => Ok(ReadResourceResult {
                contents: vec![ResourceContents::text(
                    self.endpoint_listing(),
                    ENDPOINTS_RESOURCE_URI,
                )],
            }),
            other => Err(McpError::resource_not_found(
                format!("unknown resource {other}"),
                None,
            )),
        };
        async move { result }
    }

    fn get_info(&self) -> ServerInfo {
        let capabilities = ServerCapabilities::builder()
            .enable_tools()
            .enable_resources()
            .build();
        ServerInfo {
            capabilities,
            server_info: Implementation {
                name: "voitta-gateway".into(),
                title: Some("Voitta MCP Gateway".into()),
                version: env!("CARGO_PKG_VERSION").into(),
                icons: None,
                website_url: None,
            },
            ..Default::default()
        }
    }
}
