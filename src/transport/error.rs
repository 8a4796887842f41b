//! Transport-specific error types.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors that can occur while talking to a backend process.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to spawn the backend process.
    #[error("failed to spawn backend process `{program}`: {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: io::Error,
    },

    /// Failed to write to backend stdin.
    #[error("failed to write to backend: {0}")]
    WriteFailed(#[source] io::Error),

    /// Failed to serialize a request to JSON.
    #[error("failed to serialize request: {0}")]
    SerializeFailed(#[source] serde_json::Error),

    /// Failed to deserialize a response from JSON.
    #[error("failed to deserialize response: {0}")]
    DeserializeFailed(#[source] serde_json::Error),

    /// The operation did not complete within its deadline.
    #[error("{operation} timed out after {elapsed:?}")]
    Timeout {
        operation: &'static str,
        elapsed: Duration,
    },

    /// Backend process exited (or closed stdout) while a request was pending.
    #[error("backend process exited unexpectedly")]
    ProcessExited,

    /// Response channel was closed (internal error).
    #[error("response channel closed unexpectedly")]
    ChannelClosed,

    /// A session-dependent operation was issued before the handshake completed.
    #[error("no session: handshake has not completed")]
    NotInitialized,

    /// The transport has already been torn down.
    #[error("transport has been torn down")]
    TornDown,

    /// Backend answered with a JSON-RPC error object.
    #[error("backend error: {message} (code: {code})")]
    Remote {
        /// JSON-RPC error code.
        code: i64,
        /// Error message from the backend.
        message: String,
    },
}

impl TransportError {
    /// Create a remote error from a JSON-RPC error object.
    pub fn remote(code: i64, message: impl Into<String>) -> Self {
        Self::Remote {
            code,
            message: message.into(),
        }
    }

    /// Create a timeout error for the named operation.
    pub fn timeout(operation: &'static str, elapsed: Duration) -> Self {
        Self::Timeout { operation, elapsed }
    }

    /// Check if this error is a deadline expiry.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Check if this error indicates the backend has gone away.
    pub fn is_process_exited(&self) -> bool {
        matches!(self, Self::ProcessExited | Self::ChannelClosed | Self::TornDown)
    }

    /// Check if this error is retriable.
    ///
    /// Only deadline expiries are retried by the connection manager; every
    /// other fault aborts the load immediately.
    pub fn is_retriable(&self) -> bool {
        self.is_timeout()
    }
}

impl From<tokio::sync::oneshot::error::RecvError> for TransportError {
    fn from(_: tokio::sync::oneshot::error::RecvError) -> Self {
        Self::ChannelClosed
    }
}
