use std::sync::Arc;

use rmcp::model::{JsonObject, Tool};

use crate::domain::schema;
use crate::shared::types::ToolDescriptor;

/// How the dispatcher re-invokes a registered tool.
#[derive(Debug, Clone)]
pub enum ToolBinding {
    /// Forwarded to the router under the tool's full name.
    Router,
    /// Forwarded as a plain HTTP request to a bridged endpoint operation.
    Endpoint(OperationBinding),
}

#[derive(Debug, Clone)]
pub struct OperationBinding {
    pub method: reqwest::Method,
    pub base_url: String,
    pub path: String,
    pub encoding: BodyEncoding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyEncoding {
    Query,
    Form,
    Json,
}

/// One exposed tool: descriptor data plus everything needed to invoke it.
/// Records are created during initialization and never mutated.
#[derive(Debug, Clone)]
pub struct RegisteredTool {
    pub short_name: String,
    pub full_name: String,
    pub description: String,
    pub input_schema: JsonObject,
    pub binding: ToolBinding,
}

#[derive(Debug, Default)]
pub struct GatewayRegistry {
    records: Vec<RegisteredTool>,
}

impl GatewayRegistry {
    pub fn register(&mut self, descriptor: &ToolDescriptor, binding: ToolBinding) {
        let record = RegisteredTool {
            short_name: schema::short_name(&descriptor.name).to_string(),
            full_name: descriptor.name.clone(),
            description: descriptor.description.clone(),
            input_schema: schema::adapt_input_schema(&descriptor.parameters),
            binding,
        };
        tracing::debug!(short = %record.short_name, full = %record.full_name, "registered tool");
        self.records.push(record);
    }

    /// Resolve a requested name by linear scan in discovery order.
    ///
    /// A record matches when its full name equals the requested name or ends
    /// with `____{name}`. When several backends expose the same short name
    /// the earliest discovered registration wins.
    pub fn resolve(&self, name: &str) -> Option<&RegisteredTool> {
        let suffix = format!("{}{}", schema::NAME_SEPARATOR, name);
        self.records
            .iter()
            .find(|record| record.full_name == name || record.full_name.ends_with(&suffix))
    }

    pub fn records(&self) -> &[RegisteredTool] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Render the registry as MCP tool declarations, short names outward.
    pub fn list(&self) -> Vec<Tool> {
        self.records
            .iter()
            .map(|record| {
                Tool::new(
                    record.short_name.clone(),
                    record.description.clone(),
                    Arc::new(record.input_schema.clone()),
                )
            })
            .collect()
    }
}
