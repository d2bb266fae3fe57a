//! Parameter validation against a tool's declared schema.

use serde_json::Value;

/// Names from the schema's `required` list that are absent (or null) in
/// `params`. An empty result means the call may proceed.
pub fn missing_required(schema: &Value, params: &Value) -> Vec<String> {
    let Some(required) = schema.get("required").and_then(Value::as_array) else {
        return Vec::new();
    };

    required
        .iter()
        .filter_map(Value::as_str)
        .filter(|name| params.get(name).map_or(true, Value::is_null))
        .map(ToString::to_string)
        .collect()
}
