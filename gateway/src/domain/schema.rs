use serde_json::{Map, Value};

/// Separator between a backend prefix and the tool's own name.
pub const NAME_SEPARATOR: &str = "____";

const SCHEMA_KEYS: [&str; 3] = ["type", "properties", "required"];

/// Canonicalize a tool parameter descriptor into a JSON Schema object.
///
/// Sources hand over one of three shapes: a full schema (has `type`), a
/// `{properties, required}` fragment, or a flat property map. The first is
/// trusted and passed through unchanged; the other two are lifted into
/// `{type: "object", properties, required}`. Nested fragments are never
/// validated; a malformed fragment reaches the client as-is.
pub fn adapt_input_schema(parameters: &Value) -> Map<String, Value> {
    let Some(params) = parameters.as_object() else {
        return empty_schema();
    };
    if params.contains_key("type") {
        return params.clone();
    }
    let mut schema = empty_schema();
    if params.contains_key("properties") {
        schema.insert(
            "properties".into(),
            params
                .get("properties")
                .cloned()
                .unwrap_or_else(|| Value::Object(Map::new())),
        );
        schema.insert(
            "required".into(),
            params
                .get("required")
                .cloned()
                .unwrap_or_else(|| Value::Array(Vec::new())),
        );
        return schema;
    }
    let mut properties = Map::new();
    for (key, value) in params {
        if !SCHEMA_KEYS.contains(&key.as_str()) {
            properties.insert(key.clone(), value.clone());
        }
    }
    schema.insert("properties".into(), Value::Object(properties));
    schema
}

fn empty_schema() -> Map<String, Value> {
    let mut schema = Map::new();
    schema.insert("type".into(), Value::String("object".into()));
    schema.insert("properties".into(), Value::Object(Map::new()));
    schema.insert("required".into(), Value::Array(Vec::new()));
    schema
}

/// The short tool name is the suffix after the last `____` in the full name;
/// names without the separator are already short.
pub fn short_name(full_name: &str) -> &str {
    full_name
        .rsplit_once(NAME_SEPARATOR)
        .map(|(_, tail)| tail)
        .unwrap_or(full_name)
}
