//! Engine for pbixray backends (`pbixray`).
//!
//! The backend is a server script run by a Python interpreter. Sources are
//! `.pbix` files loaded through `load_pbix`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use super::connection::{Backend, ConnectionManager};
use super::discovery::{discover_binary, validate_binary_path, DiscoveryError, DiscoveryInputs};
use super::invoke::ToolInvoker;
use super::lifecycle::LifecycleState;
use super::source::{SourceError, DEFAULT_CONNECTION_ID};
use super::DocumentationEngine;
use crate::config::{EngineConfig, LoadOptions};
use crate::error::EngineResult;
use crate::metadata::pbixray::tools;
use crate::metadata::{extract_metadata, ExtractOptions, ModelMetadata, PbixRaySource};
use crate::normalize::ToolResponse;
use crate::transport::{BackendCommand, Launcher, StdioLauncher};

/// Registry key.
pub const ENGINE_KEY: &str = "pbixray";

/// Environment override for the server script.
pub const SERVER_PATH_ENV: &str = "PBIXRAY_SERVER_PATH";

/// Environment override for the interpreter.
pub const PYTHON_ENV: &str = "PBIXRAY_PYTHON";

pub const DEFAULT_PYTHON: &str = "python";
pub const DEFAULT_SERVER_SCRIPT: &str = "./pbixray-mcp-server/src/pbixray_server.py";
const SERVER_SCRIPT_NAME: &str = "pbixray_server.py";

pub struct PbixRayBackend {
    python: String,
    script_override: Option<PathBuf>,
}

impl PbixRayBackend {
    pub fn new(python: impl Into<String>, script_override: Option<PathBuf>) -> Self {
        Self {
            python: python.into(),
            script_override,
        }
    }

    pub fn from_env() -> Self {
        let python = std::env::var(PYTHON_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PYTHON.to_string());
        let script = std::env::var_os(SERVER_PATH_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        Self::new(python, script)
    }
}

#[async_trait]
impl Backend for PbixRayBackend {
    fn command(&self, config: &EngineConfig) -> Result<BackendCommand, DiscoveryError> {
        let script = match &config.server_path {
            Some(path) => validate_binary_path(path)?,
            None => {
                let inputs = DiscoveryInputs {
                    env_override: self.script_override.clone(),
                    candidates: vec![PathBuf::from(DEFAULT_SERVER_SCRIPT)],
                };
                discover_binary(None, &inputs, SERVER_SCRIPT_NAME)?
            }
        };
        Ok(BackendCommand::new(&self.python).with_args([script.display().to_string()]))
    }

    fn default_tools(&self) -> &'static [&'static str] {
        tools::DEFAULTS
    }

    async fn bind(&self, invoker: &ToolInvoker<'_>, source: &str) -> EngineResult<String> {
        let path = Path::new(source.trim());
        if !path.is_file() {
            return Err(SourceError::NotFound(path.to_path_buf()).into());
        }
        tracing::info!(file = %path.display(), "loading pbix file");

        let payload = invoker
            .call_binding(tools::LOAD_PBIX, json!({ "file_path": path.display().to_string() }), source)
            .await?;
        let response = ToolResponse::from_value(payload);
        if response.is_rejected() {
            return Err(SourceError::Rejected {
                input: source.to_string(),
                message: response
                    .message
                    .unwrap_or_else(|| "load_pbix reported failure".to_string()),
            }
            .into());
        }
        Ok(DEFAULT_CONNECTION_ID.to_string())
    }
}

/// Documentation engine backed by a pbixray server.
pub struct PbixRayEngine {
    config: EngineConfig,
    extract: ExtractOptions,
    backend: PbixRayBackend,
    connection: ConnectionManager,
}

impl PbixRayEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_launcher(config, Arc::new(StdioLauncher::new()))
    }

    pub fn with_launcher(config: EngineConfig, launcher: Arc<dyn Launcher>) -> Self {
        Self {
            config,
            extract: ExtractOptions::default(),
            backend: PbixRayBackend::from_env(),
            connection: ConnectionManager::new(launcher),
        }
    }

    pub fn with_backend(mut self, backend: PbixRayBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_extract_options(mut self, extract: ExtractOptions) -> Self {
        self.extract = extract;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

#[async_trait]
impl DocumentationEngine for PbixRayEngine {
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
        let source = PbixRaySource::new(state.invoker());
        extract_metadata(&source, &self.extract).await
    }

    async fn close(&mut self) {
        self.connection.close(&self.backend).await;
    }
}
