//! Field extraction tolerant of key-naming drift.
//!
//! Each helper takes the candidate keys in priority order. The first key
//! present with a usable value wins; otherwise the type default is returned.

use serde_json::{Map, Value};

/// First value present under any of `keys` that is not `null`.
pub fn lookup<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| obj.get(*key))
        .find(|value| !value.is_null())
}

/// String field, or `""` when absent.
pub fn str_field(obj: &Map<String, Value>, keys: &[&str]) -> String {
    opt_str_field(obj, keys).unwrap_or_default()
}

/// String field, or `default` when absent.
pub fn str_field_or(obj: &Map<String, Value>, keys: &[&str], default: &str) -> String {
    opt_str_field(obj, keys).unwrap_or_else(|| default.to_string())
}

/// Optional string field. Empty strings count as absent; numbers and
/// booleans are rendered as text.
pub fn opt_str_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match obj.get(*key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

/// Boolean field, or `false` when absent.
pub fn bool_field(obj: &Map<String, Value>, keys: &[&str]) -> bool {
    bool_field_or(obj, keys, false)
}

/// Boolean field, or `default` when absent. Accepts `"true"`/`"1"`/`"yes"`
/// strings and non-zero numbers.
pub fn bool_field_or(obj: &Map<String, Value>, keys: &[&str], default: bool) -> bool {
    keys.iter()
        .find_map(|key| obj.get(*key).and_then(as_bool_lenient))
        .unwrap_or(default)
}

/// Unsigned integer field. Accepts numeric strings.
pub fn u64_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<u64> {
    keys.iter().find_map(|key| match obj.get(*key)? {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// List field, or an empty slice when absent or not a list.
pub fn list_field<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> &'a [Value] {
    keys.iter()
        .find_map(|key| obj.get(*key).and_then(Value::as_array))
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn as_bool_lenient(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}
