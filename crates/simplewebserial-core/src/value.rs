//! JSON values exchanged with the device
//!
//! Payloads are plain `serde_json` values. Devices often report numbers as
//! strings, so [`parse_as_number`] coerces numeric strings anywhere inside a
//! value into real JSON numbers.

use serde_json::{Map, Number, Value};

/// Any JSON value carried by a message
pub type JsonValue = Value;

/// JSON object payload
pub type JsonObject = Map<String, Value>;

/// JSON array payload
pub type JsonArray = Vec<Value>;

/// Largest integer that survives a round trip through an `f64`
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Convert numeric strings into numbers, recursing into arrays and objects.
///
/// Numbers, booleans, `null` and non-numeric strings are returned unchanged.
/// A string is numeric when its trimmed form is non-empty and parses as a
/// finite decimal number, e.g. `"42"`, `" 3.14\n"` or `"2.5e-3"`.
pub fn parse_as_number(value: JsonValue) -> JsonValue {
    match value {
        Value::String(s) => match parse_numeric_str(&s) {
            Some(number) => Value::Number(number),
            None => Value::String(s),
        },
        Value::Array(items) => Value::Array(items.into_iter().map(parse_as_number).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, item)| (key, parse_as_number(item)))
                .collect(),
        ),
        other => other,
    }
}

fn parse_numeric_str(s: &str) -> Option<Number> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }

    let parsed: f64 = trimmed.parse().ok()?;
    if !parsed.is_finite() {
        return None;
    }

    // Integral values serialize as `42`, not `42.0`
    if parsed.fract() == 0.0 && parsed.abs() <= MAX_SAFE_INTEGER {
        return Some(Number::from(parsed as i64));
    }

    Number::from_f64(parsed)
}
