//! Backend transport module.
//!
//! This module provides async communication with backend processes that
//! expose model-introspection tools. A backend is launched as a child process
//! and spoken to over JSON-RPC 2.0 (MCP method names), one message per line.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  modelwiki engine (Rust + Tokio)                │
//! │  ┌───────────────────────────────────────────────────────────┐  │
//! │  │                 Launcher → Transport (Async)              │  │
//! │  │  - Spawns the backend as a child process                  │  │
//! │  │  - initialize / notifications/initialized handshake       │  │
//! │  │  - tools/list, tools/call                                 │  │
//! │  │  - Request IDs for concurrent request correlation         │  │
//! │  └───────────────────────────────────────────────────────────┘  │
//! │                              │                                  │
//! │               stdin (NDJSON) │ stdout (NDJSON)                  │
//! │                              ▼                                  │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//!                                ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                Backend (Long-Running Child Process)             │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use modelwiki::transport::{BackendCommand, Launcher, StdioLauncher};
//! use std::time::Duration;
//!
//! let command = BackendCommand::new("./backend").with_args(["--readonly"]);
//! let mut transport = StdioLauncher::new().launch(&command).await?;
//! transport.handshake(Duration::from_secs(30)).await?;
//!
//! let tools = transport.list_tools(Duration::from_secs(30)).await?;
//! let raw = transport
//!     .invoke("get_tables", serde_json::json!({}), Duration::from_secs(30))
//!     .await?;
//!
//! transport.teardown().await;
//! ```

mod client;
mod error;
pub mod protocol;

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

pub use client::{StdioLauncher, StdioTransport};
pub use error::{TransportError, TransportResult};
pub use protocol::{CallToolResult, ContentItem, ServerInfo};

/// Program and arguments used to start a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl BackendCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for BackendCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Starts backend processes.
#[async_trait]
pub trait Launcher: Send + Sync {
    /// Start the backend and return its (not yet handshaken) transport.
    async fn launch(&self, command: &BackendCommand) -> TransportResult<Box<dyn Transport>>;
}

/// A launched backend and, after `handshake`, its session.
///
/// Every operation is bounded by a caller-supplied timeout. A timeout aborts
/// only that operation; the transport stays usable and the call can be
/// retried.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Run the startup handshake, turning the launched process into a session.
    async fn handshake(&mut self, timeout: Duration) -> TransportResult<ServerInfo>;

    /// Call a tool with one aggregate argument object; returns the raw
    /// response envelope. Fails with [`TransportError::NotInitialized`]
    /// before the handshake.
    async fn invoke(&self, tool: &str, arguments: Value, timeout: Duration) -> TransportResult<Value>;

    /// Names of the tools the backend advertises.
    async fn list_tools(&self, timeout: Duration) -> TransportResult<Vec<String>>;

    /// Stop the backend. Safe to call repeatedly and after the process exited.
    async fn teardown(&mut self);

    /// Whether the backend process still appears to be running.
    fn is_alive(&self) -> bool;
}
