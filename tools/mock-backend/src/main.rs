use anyhow::Result;
use rmcp::schemars::JsonSchema;
use rmcp::{ServiceExt, transport::stdio};
use tracing_subscriber::EnvFilter;

/// Minimal stdio MCP server the gateway integration tests route through.
/// `MOCK_SERVER_NAME` makes each instance identifiable in its replies.
#[derive(Clone)]
struct MockBackend {
    name: String,
}

impl MockBackend {
    fn from_env() -> Self {
        Self {
            name: std::env::var("MOCK_SERVER_NAME").unwrap_or_else(|_| "mock".into()),
        }
    }

    fn list_tools(&self) -> Vec<rmcp::model::Tool> {
        use rmcp::handler::server::wrapper::Parameters;
        fn schema_for<T: rmcp::schemars::JsonSchema + 'static>()
        -> std::sync::Arc<rmcp::model::JsonObject> {
            rmcp::handler::server::common::cached_schema_for_type::<T>()
        }
        vec![
            rmcp::model::Tool::new(
                "greet",
                "Return a plain-text greeting.",
                schema_for::<Parameters<GreetArgs>>(),
            ),
            rmcp::model::Tool::new(
                "echo",
                "Echo the supplied text back as structured JSON.",
                schema_for::<Parameters<EchoArgs>>(),
            ),
            rmcp::model::Tool::new(
                "boom",
                "Always fail with the message 'boom'.",
                schema_for::<Parameters<BoomArgs>>(),
            ),
        ]
    }

    fn call_tool(&self, request: rmcp::model::CallToolRequestParam) -> rmcp::model::CallToolResult {
        match request.name.as_ref() {
            "greet" => rmcp::model::CallToolResult::success(vec![rmcp::model::Content::text(
                format!("hello from {}", self.name),
            )]),
            "echo" => {
                let args = request
                    .arguments
                    .and_then(|map| {
                        serde_json::from_value::<EchoArgs>(serde_json::Value::Object(map)).ok()
                    })
                    .unwrap_or_default();
                rmcp::model::CallToolResult::structured(serde_json::json!({
                    "echoed": args.text,
                    "server": self.name,
                }))
            }
            "boom" => rmcp::model::CallToolResult::error(vec![rmcp::model::Content::text("boom")]),
            other => rmcp::model::CallToolResult::error(vec![rmcp::model::Content::text(
                format!("unknown tool: {other}"),
            )]),
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize, JsonSchema)]
struct GreetArgs {}

#[derive(Debug, Clone, Default, serde::Deserialize, JsonSchema)]
struct EchoArgs {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Clone, Default, serde::Deserialize, JsonSchema)]
struct BoomArgs {}

impl rmcp::ServerHandler for MockBackend {
    fn initialize(
        &self,
        request: rmcp::model::InitializeRequestParam,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<rmcp::model::InitializeResult, rmcp::ErrorData>>
    + Send
    + '_ {
        async move {
            let capabilities = rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build();
            let info = rmcp::model::ServerInfo {
                capabilities,
                server_info: rmcp::model::Implementation {
                    name: "mock-backend".into(),
                    title: Some("Mock Backend Server".into()),
                    version: env!("CARGO_PKG_VERSION").into(),
                    icons: None,
                    website_url: None,
                },
                protocol_version: request.protocol_version,
                instructions: None,
            };
            Ok(info)
        }
    }

    fn list_tools(
        &self,
        _request: Option<rmcp::model::PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<rmcp::model::ListToolsResult, rmcp::ErrorData>>
    + Send
    + '_ {
        let tools = self.list_tools();
        async move {
            Ok(rmcp::model::ListToolsResult {
                tools,
                next_cursor: None,
            })
        }
    }

    fn call_tool(
        &self,
        request: rmcp::model::CallToolRequestParam,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<rmcp::model::CallToolResult, rmcp::ErrorData>>
    + Send
    + '_ {
        let response = self.call_tool(request);
        async move { Ok(response) }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();

    let server = MockBackend::from_env().serve(stdio()).await?;
    tracing::info!("mock backend ready");
    server.waiting().await?;
    Ok(())
}
