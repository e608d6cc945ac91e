use anyhow::{Context, Result};
use reqwest::Method;
use serde_json::{Map, Value};

use crate::app::registry::{BodyEncoding, OperationBinding};
use crate::shared::types::ToolDescriptor;

/// One bridged operation: the tool descriptor plus how to call it.
#[derive(Debug, Clone)]
pub struct BridgedOperation {
    pub descriptor: ToolDescriptor,
    pub binding: OperationBinding,
}

/// Everything discovered from a single endpoint.
#[derive(Debug, Clone)]
pub struct DiscoveredEndpoint {
    pub prompt: Option<String>,
    pub operations: Vec<BridgedOperation>,
}

const METHODS: [&str; 7] = ["get", "post", "put", "delete", "patch", "head", "options"];

/// Fetch and translate one endpoint's OpenAPI document.
pub async fn discover_endpoint(
    http: &reqwest::Client,
    name: &str,
    base_url: &str,
) -> Result<DiscoveredEndpoint> {
    let document: Value = http
        .get(format!("{base_url}/openapi.json"))
        .send()
        .await
        .context("fetch openapi.json")?
        .json()
        .await
        .context("parse openapi.json")?;
    let prompt = fetch_prompt(http, base_url).await;
    Ok(DiscoveredEndpoint {
        prompt,
        operations: operations_from_document(name, base_url, &document),
    })
}

/// `GET {url}/__prompt__`; any failure means "no prompt available".
async fn fetch_prompt(http: &reqwest::Client, base_url: &str) -> Option<String> {
    match http.get(format!("{base_url}/__prompt__")).send().await {
        Ok(response) => response.text().await.ok().filter(|text| !text.is_empty()),
        Err(_) => None,
    }
}

/// Walk `paths` and keep every operation explicitly flagged for exposure
/// (`CPM` or `x-CPM`) that carries an `operationId`.
pub fn operations_from_document(
    endpoint: &str,
    base_url: &str,
    document: &Value,
) -> Vec<BridgedOperation> {
    let mut operations = Vec::new();
    let Some(paths) = document.get("paths").and_then(Value::as_object) else {
        return operations;
    };
    for (path, item) in paths {
        let Some(item) = item.as_object() else { continue };
        for method_name in METHODS {
            let Some(operation) = item.get(method_name).and_then(Value::as_object) else {
                continue;
            };
            if !is_exposed(operation) {
                continue;
            }
            let Some(operation_id) = operation.get("operationId").and_then(Value::as_str) else {
                continue;
            };
            let method = to_method(method_name);
            let (parameters, body_encoding) = parameter_schema(operation);
            let encoding = match method {
                Method::GET => BodyEncoding::Query,
                Method::POST => body_encoding,
                _ => BodyEncoding::Json,
            };
            let description = operation
                .get("summary")
                .or_else(|| operation.get("description"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            operations.push(BridgedOperation {
                descriptor: ToolDescriptor {
                    name: format!("{endpoint}_{operation_id}"),
                    description,
                    parameters,
                },
                binding: OperationBinding {
                    method,
                    base_url: base_url.to_string(),
                    path: path.clone(),
                    encoding,
                },
            });
        }
    }
    operations
}

fn is_exposed(operation: &Map<String, Value>) -> bool {
    operation
        .get("CPM")
        .or_else(|| operation.get("x-CPM"))
        .map(|flag| !matches!(flag, Value::Bool(false) | Value::Null))
        .unwrap_or(false)
}

fn to_method(name: &str) -> Method {
    match name {
        "get" => Method::GET,
        "post" => Method::POST,
        "put" => Method::PUT,
        "delete" => Method::DELETE,
        "patch" => Method::PATCH,
        "head" => Method::HEAD,
        _ => Method::OPTIONS,
    }
}

/// Assemble a `{properties, required}` fragment from the operation's query
/// parameters and request-body schema; the schema adapter lifts it into the
/// canonical shape at registration.
fn parameter_schema(operation: &Map<String, Value>) -> (Value, BodyEncoding) {
    let mut properties = Map::new();
    let mut required = Vec::new();
    if let Some(parameters) = operation.get("parameters").and_then(Value::as_array) {
        for parameter in parameters {
            let Some(name) = parameter.get("name").and_then(Value::as_str) else {
                continue;
            };
            let fragment = parameter
                .get("schema")
                .cloned()
                .unwrap_or_else(|| Value::Object(Map::new()));
            properties.insert(name.to_string(), fragment);
            if parameter
                .get("required")
                .and_then(Value::as_bool)
                .unwrap_or(false)
            {
                required.push(Value::String(name.to_string()));
            }
        }
    }
    let mut encoding = BodyEncoding::Json;
    if let Some(content) = operation
        .get("requestBody")
        .and_then(|body| body.pointer("/content"))
        .and_then(Value::as_object)
    {
        if let Some((content_type, media)) = content.iter().next() {
            if content_type.contains("form-urlencoded") {
                encoding = BodyEncoding::Form;
            }
            if let Some(body_schema) = media.get("schema").and_then(Value::as_object) {
                if let Some(props) = body_schema.get("properties").and_then(Value::as_object) {
                    for (key, value) in props {
                        properties.insert(key.clone(), value.clone());
                    }
                }
                if let Some(names) = body_schema.get("required").and_then(Value::as_array) {
                    required.extend(names.iter().cloned());
                }
            }
        }
    }
    let mut schema = Map::new();
    schema.insert("properties".into(), Value::Object(properties));
    schema.insert("required".into(), Value::Array(required));
    (Value::Object(schema), encoding)
}

/// Forward one call to a bridged operation. The response body comes back
/// verbatim; transport failures bubble up to the dispatcher's error path.
pub async fn invoke_operation(
    http: &reqwest::Client,
    binding: &OperationBinding,
    arguments: &Map<String, Value>,
) -> Result<String> {
    // Path templates are not expanded; the operation path is used as-is.
    let url = format!("{}{}", binding.base_url, binding.path);
    let request = match binding.encoding {
        BodyEncoding::Query => http
            .request(binding.method.clone(), &url)
            .query(&query_pairs(arguments)),
        BodyEncoding::Form => http
            .request(binding.method.clone(), &url)
            .form(&query_pairs(arguments)),
        BodyEncoding::Json => http
            .request(binding.method.clone(), &url)
            .json(&Value::Object(arguments.clone())),
    };
    let response = request
        .send()
        .await
        .with_context(|| format!("request {url}"))?;
    response
        .text()
        .await
        .with_context(|| format!("read response from {url}"))
}

fn query_pairs(arguments: &Map<String, Value>) -> Vec<(String, String)> {
    arguments
        .iter()
        .map(|(key, value)| {
            let rendered = match value {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            (key.clone(), rendered)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document() -> Value {
        json!({
            "openapi": "3.1.0",
            "paths": {
                "/search": {
                    "get": {
                        "operationId": "search",
                        "summary": "Search things",
                        "x-CPM": true,
                        "parameters": [
                            {"name": "q", "in": "query", "required": true,
                             "schema": {"type": "string"}}
                        ]
                    }
                },
                "/hidden": {
                    "get": {"operationId": "hidden", "summary": "not exposed"}
                },
                "/anonymous": {
                    "get": {"CPM": true, "summary": "flagged but unnamed"}
                },
                "/submit": {
                    "post": {
                        "operationId": "submit",
                        "CPM": true,
                        "requestBody": {
                            "content": {
                                "application/x-www-form-urlencoded": {
                                    "schema": {
                                        "type": "object",
                                        "properties": {"value": {"type": "integer"}},
                                        "required": ["value"]
                                    }
                                }
                            }
                        }
                    },
                    "delete": {
                        "operationId": "retract",
                        "x-CPM": true
                    }
                }
            }
        })
    }

    fn find<'a>(operations: &'a [BridgedOperation], name: &str) -> &'a BridgedOperation {
        operations
            .iter()
            .find(|op| op.descriptor.name == name)
            .unwrap()
    }

    #[test]
    fn unflagged_operations_are_never_registered() {
        let operations = operations_from_document("svc", "http://x", &document());
        assert!(operations.iter().all(|op| op.descriptor.name != "svc_hidden"));
    }

    #[test]
    fn flagged_operations_without_operation_id_are_skipped() {
        let operations = operations_from_document("svc", "http://x", &document());
        assert_eq!(operations.len(), 3);
    }

    #[test]
    fn tools_are_named_endpoint_underscore_operation_id() {
        let operations = operations_from_document("svc", "http://x", &document());
        let names: Vec<_> = operations
            .iter()
            .map(|op| op.descriptor.name.as_str())
            .collect();
        assert!(names.contains(&"svc_search"));
        assert!(names.contains(&"svc_submit"));
        assert!(names.contains(&"svc_retract"));
    }

    #[test]
    fn get_operations_send_query_parameters() {
        let operations = operations_from_document("svc", "http://x", &document());
        let search = find(&operations, "svc_search");
        assert_eq!(search.binding.method, Method::GET);
        assert_eq!(search.binding.encoding, BodyEncoding::Query);
        assert_eq!(search.binding.path, "/search");
        assert_eq!(
            search.descriptor.parameters,
            json!({"properties": {"q": {"type": "string"}}, "required": ["q"]})
        );
    }

    #[test]
    fn form_request_bodies_select_form_encoding() {
        let operations = operations_from_document("svc", "http://x", &document());
        let submit = find(&operations, "svc_submit");
        assert_eq!(submit.binding.encoding, BodyEncoding::Form);
        assert_eq!(
            submit.descriptor.parameters,
            json!({"properties": {"value": {"type": "integer"}}, "required": ["value"]})
        );
    }

    #[test]
    fn other_methods_fall_back_to_json_bodies() {
        let operations = operations_from_document("svc", "http://x", &document());
        let retract = find(&operations, "svc_retract");
        assert_eq!(retract.binding.method, Method::DELETE);
        assert_eq!(retract.binding.encoding, BodyEncoding::Json);
    }

    #[test]
    fn cpm_false_is_not_exposed() {
        let doc = json!({
            "paths": {"/a": {"get": {"operationId": "a", "CPM": false}}}
        });
        assert!(operations_from_document("svc", "http://x", &doc).is_empty());
    }

    #[test]
    fn document_without_paths_yields_nothing() {
        assert!(operations_from_document("svc", "http://x", &json!({})).is_empty());
    }

    #[test]
    fn query_pairs_render_non_strings_as_json() {
        let mut arguments = Map::new();
        arguments.insert("q".into(), json!("text"));
        arguments.insert("limit".into(), json!(5));
        let pairs = query_pairs(&arguments);
        assert!(pairs.contains(&("q".into(), "text".into())));
        assert!(pairs.contains(&("limit".into(), "5".into())));
    }
}
