//! Connection manager.
//!
//! Drives one engine instance through discovery, launch, handshake, tool
//! discovery and source binding, and owns the resulting [`ConnectionState`].
//! Every launched transport is torn down exactly once: on a failed attempt,
//! on a failed bind, or on close.

use std::sync::Arc;

use async_trait::async_trait;

use super::discovery::DiscoveryError;
use super::invoke::{ToolInvoker, ToolSet};
use super::lifecycle::{Lifecycle, LifecycleState};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::transport::{BackendCommand, Launcher, ServerInfo, Transport, TransportError};

/// Backend-specific pieces of a connection.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Resolve the command that starts the backend.
    fn command(&self, config: &EngineConfig) -> Result<BackendCommand, DiscoveryError>;

    /// Tools assumed when the backend can't enumerate its own.
    fn default_tools(&self) -> &'static [&'static str];

    /// Bind `source` and return the connection identifier.
    async fn bind(&self, invoker: &ToolInvoker<'_>, source: &str) -> EngineResult<String>;

    /// Release the binding before teardown. Errors are logged, never raised.
    async fn unbind(&self, _invoker: &ToolInvoker<'_>, _connection_id: &str) -> EngineResult<()> {
        Ok(())
    }
}

/// Everything that exists only while an engine is `Ready`.
pub struct ConnectionState {
    pub transport: Box<dyn Transport>,
    pub server_info: ServerInfo,
    pub tools: ToolSet,
    pub connection_id: String,
    pub source: String,
    pub config: EngineConfig,
}

impl ConnectionState {
    pub fn invoker(&self) -> ToolInvoker<'_> {
        ToolInvoker::new(self.transport.as_ref(), &self.tools, self.config.timeout)
    }
}

pub struct ConnectionManager {
    launcher: Arc<dyn Launcher>,
    lifecycle: Lifecycle,
    state: Option<ConnectionState>,
}

impl ConnectionManager {
    pub fn new(launcher: Arc<dyn Launcher>) -> Self {
        Self {
            launcher,
            lifecycle: Lifecycle::new(),
            state: None,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// The live connection, or a state error naming `operation`.
    pub fn connection(&self, operation: &'static str) -> EngineResult<&ConnectionState> {
        self.lifecycle.require(LifecycleState::Ready, operation)?;
        self.state
            .as_ref()
            .ok_or_else(|| EngineError::state(operation, "ready", self.lifecycle.state()))
    }

    /// Bring the connection to `Ready` against `source`.
    pub async fn open(&mut self, backend: &dyn Backend, config: EngineConfig, source: &str) -> EngineResult<()> {
        self.lifecycle.transition(LifecycleState::Discovering, "load")?;

        let command = match backend.command(&config) {
            Ok(command) => command,
            Err(e) => {
                tracing::error!(error = %e, "backend discovery failed");
                self.lifecycle.fail();
                return Err(e.into());
            }
        };
        tracing::debug!(command = %command, "resolved backend command");

        let (mut transport, server_info) = match self.connect(&command, &config).await {
            Ok(connected) => connected,
            Err(e) => {
                self.lifecycle.fail();
                return Err(e);
            }
        };

        self.lifecycle.transition(LifecycleState::ToolDiscovery, "load")?;
        let tools = match transport.list_tools(config.timeout).await {
            Ok(names) if !names.is_empty() => ToolSet::discovered(names),
            Ok(_) => {
                tracing::warn!("backend advertised no tools; assuming defaults");
                ToolSet::assumed(backend.default_tools())
            }
            Err(e) => {
                tracing::warn!(error = %e, "tool discovery failed; assuming defaults");
                ToolSet::assumed(backend.default_tools())
            }
        };
        tracing::debug!(count = tools.len(), assumed = tools.is_assumed(), "tool set ready");

        self.lifecycle.transition(LifecycleState::SourceBinding, "load")?;
        let bound = {
            let invoker = ToolInvoker::new(transport.as_ref(), &tools, config.timeout);
            backend.bind(&invoker, source).await
        };
        let connection_id = match bound {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(source, error = %e, "source binding failed");
                transport.teardown().await;
                self.lifecycle.fail();
                return Err(e);
            }
        };

        self.lifecycle.transition(LifecycleState::Ready, "load")?;
        tracing::info!(
            source,
            connection = %connection_id,
            server = %server_info.name,
            "connection ready"
        );
        self.state = Some(ConnectionState {
            transport,
            server_info,
            tools,
            connection_id,
            source: source.to_string(),
            config,
        });
        Ok(())
    }

    /// Launch and handshake, retrying on timeouts.
    async fn connect(
        &mut self,
        command: &BackendCommand,
        config: &EngineConfig,
    ) -> EngineResult<(Box<dyn Transport>, ServerInfo)> {
        let attempts = config.attempts();

        for attempt in 1..=attempts {
            self.lifecycle.transition(LifecycleState::Launching, "load")?;
            tracing::debug!(attempt, attempts, "launching backend");

            let launched = tokio::time::timeout(config.timeout, self.launcher.launch(command))
                .await
                .unwrap_or_else(|_| Err(TransportError::timeout("launch", config.timeout)));

            let error = match launched {
                Ok(mut transport) => {
                    self.lifecycle.transition(LifecycleState::Handshaking, "load")?;
                    match transport.handshake(config.timeout).await {
                        Ok(info) => {
                            tracing::debug!(attempt, server = %info.name, version = %info.version, "handshake complete");
                            return Ok((transport, info));
                        }
                        Err(e) => {
                            transport.teardown().await;
                            e
                        }
                    }
                }
                Err(e) => e,
            };

            if !error.is_retriable() {
                tracing::error!(attempt, error = %error, "backend connection failed");
                return Err(EngineError::connection(attempt, error));
            }
            if attempt == attempts {
                tracing::error!(attempts, error = %error, "backend connection retries exhausted");
                return Err(EngineError::connection(attempt, error));
            }

            tracing::warn!(attempt, attempts, error = %error, "connection attempt timed out; retrying");
            if !config.retry_backoff.is_zero() {
                tokio::time::sleep(config.retry_backoff).await;
            }
        }

        Err(EngineError::connection(attempts, "no connection attempt was made"))
    }

    /// Unbind and tear down. Safe in any state; never tears down twice.
    pub async fn close(&mut self, backend: &dyn Backend) {
        let current = self.lifecycle.state();
        if matches!(current, LifecycleState::Idle | LifecycleState::Closed) {
            return;
        }

        if self.lifecycle.transition(LifecycleState::Closing, "close").is_err() {
            return;
        }

        if let Some(mut state) = self.state.take() {
            if current == LifecycleState::Ready {
                if let Err(e) = backend.unbind(&state.invoker(), &state.connection_id).await {
                    tracing::warn!(error = %e, "disconnect failed; tearing down anyway");
                }
            }
            state.transport.teardown().await;
            tracing::info!(source = %state.source, "connection closed");
        }

        // Closing -> Closed is always legal.
        let _ = self.lifecycle.transition(LifecycleState::Closed, "close");
    }
}
