use serde_json::Value;

/// Coerces `value` to a boolean.
///
/// Only the boolean `true` and the string `"true"` are truthy; every other value, including
/// `"TRUE"` and `1`, is `false`.
pub fn to_bool(value: &Value) -> bool {
    match value {
        Value::Bool(value) => *value,
        Value::String(value) => value == "true",
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_to_bool() {
        assert!(to_bool(&json!(true)));
        assert!(to_bool(&json!("true")));
        assert!(!to_bool(&json!("TRUE")));
        assert!(!to_bool(&json!(1)));
        assert!(!to_bool(&json!(null)));
        assert!(!to_bool(&json!(false)));
    }
}
