use async_trait::async_trait;
use rmcp::{
    ServiceExt,
    model::{CallToolRequestParam, CallToolResult, JsonObject},
    service::{RoleClient, RunningService},
    transport::{
        child_process::TokioChildProcess, sse_client::SseClientTransport,
        streamable_http_client::StreamableHttpClientTransport,
    },
};
use serde_json::Value;
use std::process::Stdio;
use tokio::process::Command;

use crate::domain::schema::NAME_SEPARATOR;
use crate::infra::config::{BackendConfig, BackendTransport};
use crate::shared::{error::GatewayError, types::ToolDescriptor, utils::parse_command};

/// The routing layer the gateway delegates discovery and execution to.
///
/// The gateway never interprets tool semantics; it adapts the descriptors
/// this trait yields and forwards calls back through it.
#[async_trait]
pub trait ToolRouter: Send + Sync {
    /// Tool descriptors discovered at startup, in discovery order.
    fn descriptors(&self) -> &[ToolDescriptor];

    /// Forward a call to the backend owning `full_name`.
    async fn call(
        &self,
        full_name: &str,
        arguments: JsonObject,
    ) -> Result<Value, GatewayError>;
}

struct Backend {
    name: String,
    client: RunningService<RoleClient, ()>,
}

/// Router over a set of backend MCP servers. Connections are established once
/// at startup and held for the process lifetime.
pub struct McpToolRouter {
    backends: Vec<Backend>,
    descriptors: Vec<ToolDescriptor>,
}

impl McpToolRouter {
    /// Connect to every configured backend and list its tools, one backend at
    /// a time. Any failure here aborts startup.
    pub async fn connect(configs: &[BackendConfig]) -> Result<Self, GatewayError> {
        let mut backends = Vec::new();
        let mut descriptors = Vec::new();
        for config in configs {
            let client = Self::connect_backend(config).await.map_err(|err| {
                GatewayError::RouterInit(format!("backend '{}': {err}", config.name))
            })?;
            let tools = client
                .list_tools(Default::default())
                .await
                .map_err(|err| {
                    GatewayError::RouterInit(format!(
                        "backend '{}': list tools: {err}",
                        config.name
                    ))
                })?
                .tools;
            tracing::info!(backend = %config.name, count = tools.len(), "discovered backend tools");
            for tool in &tools {
                descriptors.push(ToolDescriptor {
                    name: format!("{}{}{}", config.name, NAME_SEPARATOR, tool.name),
                    description: tool.description.as_deref().unwrap_or_default().to_string(),
                    parameters: Value::Object(tool.input_schema.as_ref().clone()),
                });
            }
            backends.push(Backend {
                name: config.name.clone(),
                client,
            });
        }
        Ok(Self {
            backends,
            descriptors,
        })
    }

    async fn connect_backend(
        config: &BackendConfig,
    ) -> anyhow::Result<RunningService<RoleClient, ()>> {
        match config.transport {
            BackendTransport::Stdio => {
                let raw = config
                    .command
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("stdio backend requires 'command'"))?;
                let (program, parsed_args) = parse_command(raw)?;
                let mut cmd = Command::new(program);
                cmd.args(parsed_args);
                if let Some(args) = &config.args {
                    cmd.args(args);
                }
                if let Some(env) = &config.env {
                    for (key, value) in env {
                        cmd.env(key, value);
                    }
                }
                if let Some(cwd) = &config.cwd {
                    cmd.current_dir(cwd);
                }
                cmd.stdin(Stdio::piped())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::inherit());
                let transport = TokioChildProcess::new(cmd)?;
                Ok(().serve(transport).await?)
            }
            BackendTransport::Sse => {
                let url = config
                    .url
                    .clone()
                    .ok_or_else(|| anyhow::anyhow!("sse backend requires 'url'"))?;
                let transport = SseClientTransport::start(url).await?;
                Ok(().serve(transport).await?)
            }
            BackendTransport::Http => {
                let url = config
                    .url
                    .clone()
                    .ok_or_else(|| anyhow::anyhow!("http backend requires 'url'"))?;
                let mut cfg =
                    rmcp::transport::streamable_http_client::StreamableHttpClientTransportConfig::with_uri(
                        url,
                    );
                if let Some(token) = &config.auth_token {
                    cfg = cfg.auth_header(token.clone());
                }
                let transport =
                    StreamableHttpClientTransport::with_client(reqwest::Client::new(), cfg);
                Ok(().serve(transport).await?)
            }
        }
    }

    fn backend_for<'a>(&self, full_name: &'a str) -> Option<(&Backend, &'a str)> {
        let (backend_name, tool) = full_name.split_once(NAME_SEPARATOR)?;
        let backend = self.backends.iter().find(|b| b.name == backend_name)?;
        Some((backend, tool))
    }
}

#[async_trait]
impl ToolRouter for McpToolRouter {
    fn descriptors(&self) -> &[ToolDescriptor] {
        &self.descriptors
    }

    async fn call(
        &self,
        full_name: &str,
        arguments: JsonObject,
    ) -> Result<Value, GatewayError> {
        let (backend, tool) = self
            .backend_for(full_name)
            .ok_or_else(|| GatewayError::ToolNotFound(full_name.to_string()))?;
        let result = backend
            .client
            .call_tool(CallToolRequestParam {
                name: tool.to_string().into(),
                arguments: Some(arguments),
            })
            .await
            .map_err(|err| GatewayError::invocation(err.to_string()))?;
        into_value(result)
    }
}

/// Collapse a backend result into a single JSON value for the formatter.
///
/// A result flagged as a tool error becomes an invocation failure whose
/// message is the joined text content.
fn into_value(result: CallToolResult) -> Result<Value, GatewayError> {
    let text = joined_text(&result);
    if result.is_error.unwrap_or(false) {
        return Err(GatewayError::invocation(text));
    }
    if let Some(structured) = result.structured_content {
        return Ok(structured);
    }
    Ok(Value::String(text))
}

fn joined_text(result: &CallToolResult) -> String {
    result
        .content
        .iter()
        .filter_map(|item| item.as_text().map(|t| t.text.clone()))
        .collect::<Vec<_>>()
        .join("\n")
}
