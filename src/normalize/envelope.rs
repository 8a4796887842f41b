//! Response envelope decoding.
//!
//! Backends wrap a tool's payload in one of several shapes depending on
//! vendor and version. All of them decode to the same `serde_json::Value`:
//!
//! | Variant | Shape                                                    |
//! |---------|----------------------------------------------------------|
//! | bare    | the payload object/array itself                          |
//! | content | `{"content": [{"type": "text", "text": "<json>"}], ...}` |
//! | typed   | [`CallToolResult`] whose items expose `text()`           |
//! | literal | `<class 'list'>\n['a', 'b']` style text                  |

use serde_json::{Map, Value};
use thiserror::Error;

use super::literal::{parse_literal, strip_type_tag};
use crate::transport::CallToolResult;

/// A raw tool response, in any of the supported encodings.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// JSON exactly as it came off the wire (bare payload or content wrapper).
    Value(Value),
    /// Already-typed tool result.
    Typed(CallToolResult),
    /// Text payload (JSON or literal-encoded, optionally type-tagged).
    Text(String),
}

impl From<Value> for Envelope {
    fn from(value: Value) -> Self {
        Envelope::Value(value)
    }
}

impl From<CallToolResult> for Envelope {
    fn from(result: CallToolResult) -> Self {
        Envelope::Typed(result)
    }
}

impl From<String> for Envelope {
    fn from(text: String) -> Self {
        Envelope::Text(text)
    }
}

impl From<&str> for Envelope {
    fn from(text: &str) -> Self {
        Envelope::Text(text.to_string())
    }
}

impl Envelope {
    /// Error text if the envelope is a tool result flagged `isError`.
    pub fn tool_error(&self) -> Option<String> {
        match self {
            Envelope::Typed(result) if result.is_error => Some(
                result
                    .first_text()
                    .unwrap_or("tool reported an error")
                    .to_string(),
            ),
            Envelope::Value(Value::Object(obj))
                if obj.get("isError").and_then(Value::as_bool) == Some(true) =>
            {
                Some(
                    content_text(obj)
                        .unwrap_or("tool reported an error")
                        .to_string(),
                )
            }
            _ => None,
        }
    }
}

/// Why an envelope could not be decoded.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("envelope carries an empty content list")]
    EmptyContent,

    #[error("no text content item in envelope")]
    NoText,

    #[error("empty payload text")]
    EmptyText,

    #[error("payload is neither JSON nor a literal: {0}")]
    Malformed(String),
}

/// Decode the payload carried by any envelope variant.
pub fn decode_envelope(envelope: impl Into<Envelope>) -> Result<Value, DecodeError> {
    match envelope.into() {
        Envelope::Text(text) => decode_text(&text),
        Envelope::Typed(result) => match result.first_text() {
            Some(text) => decode_text(text),
            None => match result.structured_content {
                Some(structured) => Ok(structured),
                None if result.content.is_empty() => Err(DecodeError::EmptyContent),
                None => Err(DecodeError::NoText),
            },
        },
        Envelope::Value(Value::String(text)) => decode_text(&text),
        Envelope::Value(Value::Object(obj)) if is_content_wrapper(&obj) => {
            match content_text(&obj) {
                Some(text) => decode_text(text),
                None => match obj.get("structuredContent") {
                    Some(structured) => Ok(structured.clone()),
                    None if content_is_empty(&obj) => Err(DecodeError::EmptyContent),
                    None => Err(DecodeError::NoText),
                },
            }
        }
        Envelope::Value(value) => Ok(value),
    }
}

/// Decode text that is JSON or literal-encoded.
///
/// Text that is not structured at all is returned as a JSON string.
pub fn decode_text(text: &str) -> Result<Value, DecodeError> {
    let body = strip_type_tag(text);
    if body.is_empty() {
        return Err(DecodeError::EmptyText);
    }

    if let Ok(value) = serde_json::from_str::<Value>(body) {
        return Ok(value);
    }

    match parse_literal(body) {
        Ok(value) => Ok(value),
        Err(errs) if body.starts_with(['[', '{', '(']) => {
            Err(DecodeError::Malformed(errs.join("; ")))
        }
        Err(_) => Ok(Value::String(body.to_string())),
    }
}

/// Decode any envelope, degrading to `Value::Null` on failure.
pub fn decode_value(envelope: impl Into<Envelope>) -> Value {
    match decode_envelope(envelope) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, "could not decode response envelope; using empty result");
            Value::Null
        }
    }
}

/// Decode any envelope as a list, degrading to an empty list on failure.
pub fn decode_list(envelope: impl Into<Envelope>) -> Vec<Value> {
    match decode_value(envelope) {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => {
            tracing::warn!(kind = json_kind(&other), "expected a list payload; using empty list");
            Vec::new()
        }
    }
}

/// Decode any envelope as an object, degrading to an empty map on failure.
pub fn decode_object(envelope: impl Into<Envelope>) -> Map<String, Value> {
    match decode_value(envelope) {
        Value::Object(obj) => obj,
        Value::Null => Map::new(),
        other => {
            tracing::warn!(kind = json_kind(&other), "expected an object payload; using empty object");
            Map::new()
        }
    }
}

/// Name of a JSON value's type, for diagnostics.
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_content_wrapper(obj: &Map<String, Value>) -> bool {
    match obj.get("content") {
        Some(Value::Array(items)) => items.iter().all(|item| {
            item.as_object()
                .map(|o| o.contains_key("type") || o.contains_key("text"))
                .unwrap_or(false)
        }),
        _ => false,
    }
}

fn content_is_empty(obj: &Map<String, Value>) -> bool {
    obj.get("content")
        .and_then(Value::as_array)
        .map(|items| items.is_empty())
        .unwrap_or(true)
}

fn content_text(obj: &Map<String, Value>) -> Option<&str> {
    obj.get("content")?
        .as_array()?
        .iter()
        .find_map(|item| item.get("text").and_then(Value::as_str))
}
