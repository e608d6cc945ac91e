use std::time::Instant;

use rmcp::model::{CallToolResult, Content, JsonObject};
use serde_json::Value;

use crate::app::bridge;
use crate::app::registry::{RegisteredTool, ToolBinding};
use crate::app::state::GatewayState;
use crate::domain::call::CallRun;
use crate::infra::metrics::{self, PendingGaugeGuard};
use crate::shared::error::GatewayError;

/// Auth parameters the router accepts empty placeholders for.
const PLACEHOLDER_PARAMS: [&str; 2] = ["token", "oauth_token"];

/// Resolve, invoke and format one tool call.
///
/// Every failure is rendered as tool-error text content; the transport layer
/// never sees an error and nothing is retried.
pub async fn dispatch_call(
    state: &GatewayState,
    name: &str,
    arguments: JsonObject,
) -> CallToolResult {
    let _inflight = PendingGaugeGuard::new();
    let timer = Instant::now();
    let mut run = CallRun::new();
    run.begin_resolving();
    tracing::debug!(run = %run.id, tool = %name, "dispatching");

    let Some(tool) = state.registry.resolve(name) else {
        run.begin_formatting();
        run.finish();
        metrics::TOOL_CALLS.with_label_values(&["not_found"]).inc();
        tracing::warn!(tool = %name, "tool not found");
        return error_text(format!("Tool {name} not found"));
    };

    run.begin_invoking();
    let arguments = with_placeholders(tool, arguments);
    let outcome = invoke(state, tool, arguments).await;

    run.begin_formatting();
    let result = match outcome {
        Ok(value) => {
            metrics::TOOL_CALLS.with_label_values(&["ok"]).inc();
            CallToolResult::success(vec![Content::text(render_value(&value))])
        }
        Err(err) => {
            metrics::TOOL_CALLS.with_label_values(&["error"]).inc();
            tracing::warn!(tool = %name, %err, "tool invocation failed");
            error_text(format!("Error calling tool {name}: {err}"))
        }
    };
    run.finish();
    metrics::CALL_LATENCY.observe(timer.elapsed().as_millis() as f64);
    result
}

async fn invoke(
    state: &GatewayState,
    tool: &RegisteredTool,
    arguments: JsonObject,
) -> Result<Value, GatewayError> {
    match &tool.binding {
        ToolBinding::Router => {
            let router = state
                .router
                .as_deref()
                .ok_or_else(|| GatewayError::invocation("router not initialized"))?;
            router.call(&tool.full_name, arguments).await
        }
        ToolBinding::Endpoint(binding) => bridge::invoke_operation(&state.http, binding, &arguments)
            .await
            .map(Value::String)
            .map_err(|err| GatewayError::invocation(err.to_string())),
    }
}

/// Schema-declared auth parameters missing from the caller's arguments are
/// forwarded as empty strings; the router reads empty credentials as "none".
fn with_placeholders(tool: &RegisteredTool, mut arguments: JsonObject) -> JsonObject {
    if let Some(properties) = tool.input_schema.get("properties").and_then(Value::as_object) {
        for param in PLACEHOLDER_PARAMS {
            if properties.contains_key(param) && !arguments.contains_key(param) {
                arguments.insert(param.to_string(), Value::String(String::new()));
            }
        }
    }
    arguments
}

/// Strings pass through verbatim, maps and sequences as indented JSON, and
/// everything else stringified.
fn render_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Object(_) | Value::Array(_) => serde_json::to_string_pretty(value)
            .unwrap_or_else(|_| value.to_string()),
        other => other.to_string(),
    }
}

fn error_text(message: String) -> CallToolResult {
    CallToolResult::error(vec![Content::text(message)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::registry::GatewayRegistry;
    use crate::shared::types::ToolDescriptor;
    use async_trait::async_trait;
    use serde_json::json;

    struct StubRouter;

    #[async_trait]
    impl crate::app::router::ToolRouter for StubRouter {
        fn descriptors(&self) -> &[ToolDescriptor] {
            &[]
        }

        async fn call(
            &self,
            full_name: &str,
            arguments: JsonObject,
        ) -> Result<Value, GatewayError> {
            match full_name {
                "backend____boom" => Err(GatewayError::invocation("boom")),
                "backend____greet" => Ok(Value::String("hello".into())),
                "backend____stats" => Ok(json!({"count": 2})),
                "backend____answer" => Ok(json!(42)),
                "backend____creds" => Ok(Value::Bool(
                    arguments.get("token") == Some(&Value::String(String::new())),
                )),
                other => Err(GatewayError::ToolNotFound(other.to_string())),
            }
        }
    }

    fn state() -> GatewayState {
        let mut registry = GatewayRegistry::default();
        for tool in ["boom", "greet", "stats", "answer"] {
            registry.register(
                &ToolDescriptor {
                    name: format!("backend____{tool}"),
                    description: String::new(),
                    parameters: json!({}),
                },
                ToolBinding::Router,
            );
        }
        registry.register(
            &ToolDescriptor {
                name: "backend____creds".into(),
                description: String::new(),
                parameters: json!({"properties": {"token": {"type": "string"}}}),
            },
            ToolBinding::Router,
        );
        GatewayState {
            registry,
            router: Some(Box::new(StubRouter)),
            endpoints: Vec::new(),
            http: reqwest::Client::new(),
        }
    }

    fn first_text(result: &CallToolResult) -> String {
        result
            .content
            .first()
            .and_then(|item| item.as_text().map(|t| t.text.clone()))
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn unknown_tool_yields_not_found_text() {
        let result = dispatch_call(&state(), "nope", JsonObject::new()).await;
        assert_eq!(result.is_error, Some(true));
        assert_eq!(result.content.len(), 1);
        assert_eq!(first_text(&result), "Tool nope not found");
    }

    #[tokio::test]
    async fn invocation_failure_yields_prefixed_text() {
        let result = dispatch_call(&state(), "boom", JsonObject::new()).await;
        assert_eq!(result.is_error, Some(true));
        assert_eq!(first_text(&result), "Error calling tool boom: boom");
    }

    #[tokio::test]
    async fn string_results_pass_through_verbatim() {
        let result = dispatch_call(&state(), "greet", JsonObject::new()).await;
        assert_ne!(result.is_error, Some(true));
        assert_eq!(first_text(&result), "hello");
    }

    #[tokio::test]
    async fn map_results_become_indented_json() {
        let result = dispatch_call(&state(), "stats", JsonObject::new()).await;
        assert_eq!(first_text(&result), "{\n  \"count\": 2\n}");
    }

    #[tokio::test]
    async fn other_results_are_stringified() {
        let result = dispatch_call(&state(), "answer", JsonObject::new()).await;
        assert_eq!(first_text(&result), "42");
    }

    #[tokio::test]
    async fn declared_auth_params_default_to_empty_strings() {
        let result = dispatch_call(&state(), "creds", JsonObject::new()).await;
        assert_eq!(first_text(&result), "true");
    }
}
