use serde_json::{Number, Value};

/// Largest integer magnitude an `f64` represents exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Coerces `value` to a number, following loose numeric parsing rules.
///
/// Strings are trimmed and parsed (an empty string is `0`, `0x`/`0o`/`0b` prefixes select a
/// radix), booleans become `1`/`0` and `null` becomes `0`. Anything that does not parse yields
/// NaN, which JSON cannot represent and is returned as `null`.
pub fn to_number(value: &Value) -> Value {
    match value {
        Value::Number(_) => value.clone(),
        other => f64_to_value(to_f64(other)),
    }
}

/// Returns the numeric value of `value` as an `f64`, or NaN when it has none.
pub fn to_f64(value: &Value) -> f64 {
    match value {
        Value::Number(number) => number.as_f64().unwrap_or(f64::NAN),
        Value::String(value) => parse_f64(value),
        Value::Bool(true) => 1.0,
        Value::Bool(false) | Value::Null => 0.0,
        Value::Array(_) | Value::Object(_) => f64::NAN,
    }
}

/// Converts `value` to a JSON number, preferring an integer representation.
///
/// Non-finite values become `null`.
pub fn f64_to_value(value: f64) -> Value {
    if value.is_finite() && value.fract() == 0.0 && value.abs() <= MAX_SAFE_INTEGER {
        return Value::from(value as i64);
    }

    Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn parse_f64(value: &str) -> f64 {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return 0.0;
    }

    let radix = match trimmed.get(..2) {
        Some("0x") | Some("0X") => Some(16),
        Some("0o") | Some("0O") => Some(8),
        Some("0b") | Some("0B") => Some(2),
        _ => None,
    };

    if let Some(radix) = radix {
        return u64::from_str_radix(&trimmed[2..], radix)
            .map(|parsed| parsed as f64)
            .unwrap_or(f64::NAN);
    }

    // Rust accepts spellings such as `inf` and `nan`; both end up as `null` once converted.
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}
