//! TOML-based configuration for modelwiki.
//!
//! Supports a config file (modelwiki.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [engine]
//! default = "mcp"
//!
//! [engines.mcp]
//! server_path = "${POWERBI_MCP_PATH}"
//! mode = "readonly"
//! timeout_secs = 90
//! max_retries = 3
//!
//! [engines.pbixray]
//! server_path = "./pbixray-mcp-server/src/pbixray_server.py"
//!
//! [extract]
//! concurrency = 4
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use super::engine::EngineOptions;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Engine selection.
    pub engine: EngineSelection,

    /// Per-engine options, keyed by registry key.
    pub engines: HashMap<String, EngineOptions>,

    /// Extraction tuning.
    pub extract: ExtractSettings,
}

/// Which engine to use when none is named.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineSelection {
    pub default: String,
}

impl Default for EngineSelection {
    fn default() -> Self {
        Self {
            default: "mcp".to_string(),
        }
    }
}

/// Extraction settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtractSettings {
    /// Maximum per-table schema calls in flight (1 = sequential).
    pub concurrency: usize,
}

impl Default for ExtractSettings {
    fn default() -> Self {
        Self { concurrency: 4 }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `MODELWIKI_CONFIG`
    /// 2. `./modelwiki.toml`
    /// 3. `~/.config/modelwiki/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("MODELWIKI_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("modelwiki.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("modelwiki").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    /// Options configured for an engine key (empty if none).
    pub fn engine_options(&self, key: &str) -> EngineOptions {
        self.engines.get(key).cloned().unwrap_or_default()
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.extract.concurrency == 0 {
            return Err(SettingsError::InvalidConfig(
                "extract.concurrency must be at least 1".to_string(),
            ));
        }
        if self.engine.default.trim().is_empty() {
            return Err(SettingsError::InvalidConfig(
                "engine.default must name an engine".to_string(),
            ));
        }
        Ok(())
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let mut var_name = String::new();
        if chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            for ch in chars.by_ref() {
                if ch == '}' {
                    break;
                }
                var_name.push(ch);
            }
        } else {
            // $VAR ends at the first non-alphanumeric/underscore
            while let Some(&ch) = chars.peek() {
                if !(ch.is_alphanumeric() || ch == '_') {
                    break;
                }
                var_name.push(ch);
                chars.next();
            }
            if var_name.is_empty() {
                // Just a lone $, keep it
                result.push('$');
                continue;
            }
        }

        let value = env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
