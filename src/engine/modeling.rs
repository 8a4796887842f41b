//! Engine for modeling backends (`mcp`).
//!
//! The backend is a native binary located through discovery and started with
//! the standard `--start`/`--skipconfirmation`/`--readonly` flags. Sources
//! are model folders, remote workspaces, or live endpoints.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Map;

use super::connection::{Backend, ConnectionManager};
use super::discovery::{discover_binary, DiscoveryError, DiscoveryInputs, MODELING_BINARY};
use super::invoke::ToolInvoker;
use super::lifecycle::LifecycleState;
use super::source::{parse_connect_response, SourceKind};
use super::DocumentationEngine;
use crate::config::{EngineConfig, LoadOptions};
use crate::error::EngineResult;
use crate::metadata::modeling::{request, tools};
use crate::metadata::{extract_metadata, ExtractOptions, ModelMetadata, ModelingSource};
use crate::transport::{BackendCommand, Launcher, StdioLauncher};

/// Registry key.
pub const ENGINE_KEY: &str = "mcp";

/// Modeling-backend specifics for the connection manager.
pub struct ModelingBackend {
    discovery: DiscoveryInputs,
}

impl ModelingBackend {
    pub fn new(discovery: DiscoveryInputs) -> Self {
        Self { discovery }
    }
}

#[async_trait]
impl Backend for ModelingBackend {
    fn command(&self, config: &EngineConfig) -> Result<BackendCommand, DiscoveryError> {
        let program = discover_binary(config.server_path.as_deref(), &self.discovery, MODELING_BINARY)?;
        Ok(BackendCommand::new(program).with_args(config.server_args()))
    }

    fn default_tools(&self) -> &'static [&'static str] {
        tools::DEFAULTS
    }

    async fn bind(&self, invoker: &ToolInvoker<'_>, source: &str) -> EngineResult<String> {
        let kind = SourceKind::classify(source)?;
        tracing::info!(source = %kind, operation = kind.operation(), "binding source");

        let payload = invoker
            .call_binding(tools::CONNECTION, kind.connect_request(), source)
            .await?;
        Ok(parse_connect_response(source, payload)?)
    }

    async fn unbind(&self, invoker: &ToolInvoker<'_>, connection_id: &str) -> EngineResult<()> {
        let mut fields = Map::new();
        fields.insert("connectionName".into(), connection_id.into());
        invoker
            .call(tools::CONNECTION, request("Disconnect", fields))
            .await
            .map(|_| ())
    }
}

/// Documentation engine backed by a modeling backend.
pub struct ModelingEngine {
    config: EngineConfig,
    extract: ExtractOptions,
    backend: ModelingBackend,
    connection: ConnectionManager,
}

impl ModelingEngine {
    /// Engine that spawns real processes and discovers the backend from the
    /// environment.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_launcher(config, Arc::new(StdioLauncher::new()))
    }

    pub fn with_launcher(config: EngineConfig, launcher: Arc<dyn Launcher>) -> Self {
        Self {
            config,
            extract: ExtractOptions::default(),
            backend: ModelingBackend::new(DiscoveryInputs::from_env()),
            connection: ConnectionManager::new(launcher),
        }
    }

    pub fn with_discovery(mut self, discovery: DiscoveryInputs) -> Self {
        self.backend = ModelingBackend::new(discovery);
        self
    }

    pub fn with_extract_options(mut self, extract: ExtractOptions) -> Self {
        self.extract = extract;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Connection identifier of the bound model, when ready.
    pub fn connection_id(&self) -> Option<&str> {
        self.connection
            .connection("connection_id")
            .ok()
            .map(|state| state.connection_id.as_str())
    }
}

#[async_trait]
impl DocumentationEngine for ModelingEngine {
    fn name(&self) -> &str {
        ENGINE_KEY
    }

    fn state(&self) -> LifecycleState {
        self.connection.state()
    }

    fn set_extract_options(&mut self, options: ExtractOptions) {
        self.extract = options;
    }

    async fn load(&mut self, source: &str, options: LoadOptions) -> EngineResult<()> {
        let config = self.config.effective(&options);
        self.connection.open(&self.backend, config, source).await
    }

    async fn extract(&mut self) -> EngineResult<ModelMetadata> {
        let state = self.connection.connection("extract")?;
        let source = ModelingSource::new(state.invoker(), &state.connection_id);
        extract_metadata(&source, &self.extract).await
    }

    async fn close(&mut self) {
        self.connection.close(&self.backend).await;
    }
}
