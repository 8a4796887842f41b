//! The `{success, data, message}` wrapper used by modeling backends.

use serde_json::{Map, Value};

use super::envelope::json_kind;
use super::fields;

/// A decoded tool payload, split into status and data.
///
/// Bare payloads (no `success` key) are treated as successful and passed
/// through unchanged as `data`.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResponse {
    pub success: bool,
    pub data: Value,
    pub message: Option<String>,
}

const SUCCESS_KEYS: &[&str] = &["success", "Success", "isSuccess"];
const DATA_KEYS: &[&str] = &["data", "Data", "result", "Result"];
const MESSAGE_KEYS: &[&str] = &["message", "Message", "error", "Error", "errorMessage"];

impl ToolResponse {
    pub fn from_value(value: Value) -> Self {
        let Value::Object(mut obj) = value else {
            return Self::ok(value);
        };

        if fields::lookup(&obj, SUCCESS_KEYS).is_none() {
            return Self::ok(Value::Object(obj));
        }

        let success = fields::bool_field_or(&obj, SUCCESS_KEYS, true);
        let message = fields::opt_str_field(&obj, MESSAGE_KEYS);
        let data = DATA_KEYS
            .iter()
            .find_map(|key| obj.remove(*key))
            .unwrap_or(Value::Null);

        Self {
            success,
            data,
            message,
        }
    }

    fn ok(data: Value) -> Self {
        Self {
            success: true,
            data,
            message: None,
        }
    }

    /// The backend explicitly reported failure.
    pub fn is_rejected(&self) -> bool {
        !self.success
    }

    /// Data as a list. Failed responses and non-list data degrade to `[]`.
    pub fn into_list(self) -> Vec<Value> {
        if !self.success {
            tracing::warn!(message = ?self.message, "backend reported failure; using empty list");
            return Vec::new();
        }
        match self.data {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            other => {
                tracing::warn!(kind = json_kind(&other), "expected list data; using empty list");
                Vec::new()
            }
        }
    }

    /// Data as an object. Failed responses and non-object data degrade to `{}`.
    pub fn into_object(self) -> Map<String, Value> {
        if !self.success {
            tracing::warn!(message = ?self.message, "backend reported failure; using empty object");
            return Map::new();
        }
        match self.data {
            Value::Object(obj) => obj,
            Value::Null => Map::new(),
            other => {
                tracing::warn!(kind = json_kind(&other), "expected object data; using empty object");
                Map::new()
            }
        }
    }
}
