//! Tool invocation against a live transport.

use std::collections::BTreeSet;
use std::time::Duration;

use serde_json::Value;

use super::source::SourceError;
use crate::error::{EngineError, EngineResult};
use crate::normalize::{decode_value, Envelope, ToolResponse};
use crate::transport::Transport;

/// Tool names a backend supports.
///
/// Either enumerated by the backend or assumed from the engine's defaults
/// when enumeration fails.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolSet {
    names: BTreeSet<String>,
    assumed: bool,
}

impl ToolSet {
    pub fn discovered<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            assumed: false,
        }
    }

    pub fn assumed(defaults: &[&str]) -> Self {
        Self {
            names: defaults.iter().map(|s| s.to_string()).collect(),
            assumed: true,
        }
    }

    pub fn contains(&self, tool: &str) -> bool {
        self.names.contains(tool)
    }

    /// Whether the set came from defaults rather than the backend.
    pub fn is_assumed(&self) -> bool {
        self.assumed
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

/// Issues tool calls with a fixed per-call timeout and decodes the results.
#[derive(Clone, Copy)]
pub struct ToolInvoker<'a> {
    transport: &'a dyn Transport,
    tools: &'a ToolSet,
    timeout: Duration,
}

impl<'a> ToolInvoker<'a> {
    pub fn new(transport: &'a dyn Transport, tools: &'a ToolSet, timeout: Duration) -> Self {
        Self {
            transport,
            tools,
            timeout,
        }
    }

    pub fn supports(&self, tool: &str) -> bool {
        self.tools.contains(tool)
    }

    pub fn tools(&self) -> &ToolSet {
        self.tools
    }

    /// Call `tool` and return its decoded payload.
    ///
    /// Transport failures and `isError` results are errors. Payloads the
    /// normalizer cannot decode degrade to `null`.
    pub async fn call(&self, tool: &str, arguments: Value) -> EngineResult<Value> {
        tracing::debug!(tool, "invoking tool");
        let raw = self
            .transport
            .invoke(tool, arguments, self.timeout)
            .await
            .map_err(|e| EngineError::protocol(tool, e))?;

        let envelope = Envelope::from(raw);
        if let Some(message) = envelope.tool_error() {
            return Err(EngineError::protocol(tool, message));
        }
        Ok(decode_value(envelope))
    }

    /// Call `tool` and split the payload into a [`ToolResponse`].
    pub async fn call_response(&self, tool: &str, arguments: Value) -> EngineResult<ToolResponse> {
        self.call(tool, arguments).await.map(ToolResponse::from_value)
    }

    /// Call the tool that binds `source`.
    ///
    /// Any failure of the call means the backend refused the source, so it
    /// surfaces as [`SourceError::Rejected`] with the backend's message.
    pub async fn call_binding(&self, tool: &str, arguments: Value, source: &str) -> Result<Value, SourceError> {
        self.call(tool, arguments).await.map_err(|err| SourceError::Rejected {
            input: source.to_string(),
            message: match err {
                EngineError::Protocol { message, .. } => message,
                other => other.to_string(),
            },
        })
    }

    /// Like [`call_response`](Self::call_response), but an explicit
    /// `success: false` is an error carrying the backend message.
    pub async fn call_checked(&self, tool: &str, arguments: Value) -> EngineResult<ToolResponse> {
        let response = self.call_response(tool, arguments).await?;
        if response.is_rejected() {
            let message = response
                .message
                .unwrap_or_else(|| "backend reported failure".to_string());
            return Err(EngineError::protocol(tool, message));
        }
        Ok(response)
    }
}
