//! Source classification and connect requests.

use std::fmt;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::metadata::modeling::request;
use crate::normalize::{fields, ToolResponse};

/// Connection identifier used when a backend's connect response omits one.
pub const DEFAULT_CONNECTION_ID: &str = "default";

const CONNECTION_ID_KEYS: &[&str] = &["connectionName", "ConnectionName", "connection_name", "connectionId"];

static URI_SCHEME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://\S+$").expect("scheme pattern is valid"));

static HOST_PORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9.\-]+:\d{1,5}$").expect("host:port pattern is valid"));

static CONNECTION_STRING_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|;)\s*(?:data source|provider)\s*=").expect("connection key pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("cannot classify source `{0}`: expected a model folder, a scheme://uri, host:port, or a connection string")]
    Unclassifiable(String),

    #[error("source `{}` does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("backend rejected source `{input}`: {message}")]
    Rejected { input: String, message: String },
}

/// How a source string binds to a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SourceKind {
    /// A model folder on the local filesystem.
    Folder(PathBuf),
    /// A remote workspace addressed by `<scheme>://...`.
    RemoteUri(String),
    /// A live endpoint: `host:port` or a `key=value;...` connection string.
    ConnectionString(String),
}

impl SourceKind {
    pub fn classify(source: &str) -> Result<Self, SourceError> {
        let trimmed = source.trim();
        if trimmed.is_empty() {
            return Err(SourceError::Unclassifiable(source.to_string()));
        }

        let path = Path::new(trimmed);
        if path.is_dir() {
            return Ok(SourceKind::Folder(path.to_path_buf()));
        }
        if URI_SCHEME.is_match(trimmed) {
            return Ok(SourceKind::RemoteUri(trimmed.to_string()));
        }
        if HOST_PORT.is_match(trimmed) || CONNECTION_STRING_KEY.is_match(trimmed) {
            return Ok(SourceKind::ConnectionString(trimmed.to_string()));
        }
        Err(SourceError::Unclassifiable(source.to_string()))
    }

    /// Backend operation this source binds with.
    pub fn operation(&self) -> &'static str {
        match self {
            SourceKind::Folder(_) => "ConnectFolder",
            SourceKind::RemoteUri(_) => "ConnectFabric",
            SourceKind::ConnectionString(_) => "Connect",
        }
    }

    /// Argument for the modeling connection tool.
    pub fn connect_request(&self) -> Value {
        let mut fields = Map::new();
        match self {
            SourceKind::Folder(path) => {
                fields.insert("folderPath".into(), Value::String(path.display().to_string()));
            }
            SourceKind::RemoteUri(uri) => {
                fields.insert("dataSource".into(), Value::String(uri.clone()));
            }
            SourceKind::ConnectionString(conn) => {
                fields.insert("connectionString".into(), Value::String(conn.clone()));
            }
        }
        request(self.operation(), fields)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Folder(path) => write!(f, "folder {}", path.display()),
            SourceKind::RemoteUri(uri) => write!(f, "remote workspace {uri}"),
            SourceKind::ConnectionString(conn) => write!(f, "connection string {conn}"),
        }
    }
}

/// Interpret a decoded connect payload.
///
/// An explicit failure is a rejection. The connection identifier is read
/// from `data`, then from the top level; a missing one falls back to
/// [`DEFAULT_CONNECTION_ID`].
pub fn parse_connect_response(input: &str, payload: Value) -> Result<String, SourceError> {
    let top_level = match &payload {
        Value::Object(obj) => fields::opt_str_field(obj, CONNECTION_ID_KEYS),
        _ => None,
    };

    let response = ToolResponse::from_value(payload);
    if response.is_rejected() {
        return Err(SourceError::Rejected {
            input: input.to_string(),
            message: response
                .message
                .unwrap_or_else(|| "connect reported failure".to_string()),
        });
    }

    let id = match &response.data {
        Value::Object(obj) => fields::opt_str_field(obj, CONNECTION_ID_KEYS),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    };

    Ok(id.or(top_level).unwrap_or_else(|| {
        tracing::warn!(source = input, "connect response carried no connection name; using default");
        DEFAULT_CONNECTION_ID.to_string()
    }))
}
