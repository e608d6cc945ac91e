use rmcp::schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tool metadata as produced by router discovery or the endpoint bridge.
///
/// `parameters` keeps whatever shape the source handed over; the schema
/// adapter canonicalizes it at registration time.
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Summary of one bridged endpoint, kept for the resource listing and the
/// `get_endpoint_info` tool.
#[derive(Debug, Clone, Serialize)]
pub struct EndpointInfo {
    pub name: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    pub tools: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
pub struct ToolInfoArgs {
    /// Short name of the tool to describe; omit to list every registered tool.
    pub tool_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
pub struct EndpointInfoArgs {
    /// Endpoint name to describe; omit to list every bridged endpoint.
    pub name: Option<String>,
}
