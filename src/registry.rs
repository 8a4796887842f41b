//! Engine registry.
//!
//! Maps engine keys to constructors. The registry is an ordinary value owned
//! by the caller; there is no process-wide instance.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::config::{EngineConfig, EngineOptions};
use crate::engine::{modeling, pbixray, DocumentationEngine, ModelingEngine, PbixRayEngine};
use crate::error::EngineResult;

/// Builds an engine from its effective configuration.
pub type EngineConstructor = Arc<dyn Fn(EngineConfig) -> Box<dyn DocumentationEngine> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("engine `{0}` is already registered")]
    Duplicate(String),

    #[error("unknown engine `{key}`; available engines: {}", .available.join(", "))]
    UnknownEngine { key: String, available: Vec<String> },
}

/// How to configure an engine obtained from the registry.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineSettings {
    /// Use this config as-is.
    Config(EngineConfig),
    /// Merge these options over the engine's registered defaults.
    Options(EngineOptions),
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings::Options(EngineOptions::default())
    }
}

impl From<EngineConfig> for EngineSettings {
    fn from(config: EngineConfig) -> Self {
        EngineSettings::Config(config)
    }
}

impl From<EngineOptions> for EngineSettings {
    fn from(options: EngineOptions) -> Self {
        EngineSettings::Options(options)
    }
}

struct Registration {
    defaults: EngineConfig,
    constructor: EngineConstructor,
}

#[derive(Default)]
pub struct EngineRegistry {
    engines: BTreeMap<String, Registration>,
}

impl fmt::Debug for EngineRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineRegistry")
            .field("engines", &self.keys())
            .finish()
    }
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in `mcp` and `pbixray` engines.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register_builtin();
        registry
    }

    fn register_builtin(&mut self) {
        let builtin: [(&str, EngineConstructor); 2] = [
            (
                modeling::ENGINE_KEY,
                Arc::new(|config: EngineConfig| Box::new(ModelingEngine::new(config)) as Box<dyn DocumentationEngine>),
            ),
            (
                pbixray::ENGINE_KEY,
                Arc::new(|config: EngineConfig| Box::new(PbixRayEngine::new(config)) as Box<dyn DocumentationEngine>),
            ),
        ];
        for (key, constructor) in builtin {
            self.engines.insert(
                key.to_string(),
                Registration {
                    defaults: EngineConfig::default(),
                    constructor,
                },
            );
        }
    }

    /// Register `key` with the default engine config.
    pub fn register<F>(&mut self, key: impl Into<String>, constructor: F) -> Result<(), RegistryError>
    where
        F: Fn(EngineConfig) -> Box<dyn DocumentationEngine> + Send + Sync + 'static,
    {
        self.register_with_defaults(key, EngineConfig::default(), constructor)
    }

    /// Register `key` with engine-specific defaults that flat options are
    /// merged over.
    pub fn register_with_defaults<F>(
        &mut self,
        key: impl Into<String>,
        defaults: EngineConfig,
        constructor: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn(EngineConfig) -> Box<dyn DocumentationEngine> + Send + Sync + 'static,
    {
        let key = key.into();
        if self.engines.contains_key(&key) {
            return Err(RegistryError::Duplicate(key));
        }
        tracing::debug!(engine = %key, "registered engine");
        self.engines.insert(
            key,
            Registration {
                defaults,
                constructor: Arc::new(constructor),
            },
        );
        Ok(())
    }

    /// Construct the engine registered under `key`.
    pub fn get(&self, key: &str, settings: impl Into<EngineSettings>) -> EngineResult<Box<dyn DocumentationEngine>> {
        let registration = self.engines.get(key).ok_or_else(|| RegistryError::UnknownEngine {
            key: key.to_string(),
            available: self.keys(),
        })?;

        let config = match settings.into() {
            EngineSettings::Config(config) => config,
            EngineSettings::Options(options) => options.apply(registration.defaults.clone())?,
        };
        Ok((registration.constructor)(config))
    }

    /// Registered defaults for `key`.
    pub fn defaults(&self, key: &str) -> Option<&EngineConfig> {
        self.engines.get(key).map(|r| &r.defaults)
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.engines.keys().cloned().collect()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.engines.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }
}
