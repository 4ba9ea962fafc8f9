use serde_json::Value;

/// Renders `value` as a plain string.
///
/// Strings are returned without quotes, scalars use their JSON text (`null`, `true`, `30`) and
/// arrays or objects are rendered as compact JSON.
pub fn to_display_string(value: &Value) -> String {
    match value {
        Value::String(value) => value.clone(),
        other => other.to_string(),
    }
}
