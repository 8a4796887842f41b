//! Per-engine configuration.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::settings::{expand_env_vars, SettingsError};

/// Backend access mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessMode {
    #[default]
    #[serde(rename = "readonly", alias = "read-only", alias = "read_only", alias = "ro")]
    ReadOnly,
    #[serde(rename = "readwrite", alias = "read-write", alias = "read_write", alias = "rw")]
    ReadWrite,
}

impl AccessMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessMode::ReadOnly => "readonly",
            AccessMode::ReadWrite => "readwrite",
        }
    }

    /// Backend flag selecting this mode.
    pub fn flag(&self) -> &'static str {
        match self {
            AccessMode::ReadOnly => "--readonly",
            AccessMode::ReadWrite => "--readwrite",
        }
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessMode {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "readonly" | "read-only" | "read_only" | "ro" => Ok(AccessMode::ReadOnly),
            "readwrite" | "read-write" | "read_write" | "rw" => Ok(AccessMode::ReadWrite),
            other => Err(SettingsError::InvalidConfig(format!(
                "unknown access mode '{}': expected readonly or readwrite",
                other
            ))),
        }
    }
}

/// Configuration for one engine instance.
///
/// Built once when the engine is constructed. Load-time [`LoadOptions`]
/// produce an effective copy; the stored config is never changed by a load.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Backend binary. `None` means auto-discover.
    pub server_path: Option<PathBuf>,
    pub mode: AccessMode,
    /// Deadline for launch, handshake and every tool call.
    pub timeout: Duration,
    /// Launch + handshake attempts before giving up.
    pub max_retries: u32,
    pub skip_confirmation: bool,
    pub auto_start: bool,
    /// Fixed wait between attempts.
    pub retry_backoff: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            server_path: None,
            mode: AccessMode::ReadOnly,
            timeout: Duration::from_secs(60),
            max_retries: 3,
            skip_confirmation: true,
            auto_start: true,
            retry_backoff: Duration::from_secs(2),
        }
    }
}

impl EngineConfig {
    pub fn with_server_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.server_path = Some(path.into());
        self
    }

    pub fn with_mode(mut self, mode: AccessMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Number of launch attempts actually made. Always at least one.
    pub fn attempts(&self) -> u32 {
        self.max_retries.max(1)
    }

    /// Command-line flags for backends that take the standard flag set.
    pub fn server_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.auto_start {
            args.push("--start".to_string());
        }
        if self.skip_confirmation {
            args.push("--skipconfirmation".to_string());
        }
        args.push(self.mode.flag().to_string());
        args
    }

    /// Config for a single load: `options` layered over `self`.
    pub fn effective(&self, options: &LoadOptions) -> EngineConfig {
        let mut config = self.clone();
        if let Some(mode) = options.mode {
            config.mode = mode;
        }
        if let Some(timeout) = options.timeout {
            config.timeout = timeout;
        }
        config
    }
}

/// Flat, all-optional engine options merged over engine defaults.
///
/// This is also the shape of an `[engines.<key>]` table in the settings file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Backend binary (supports ${ENV_VAR} expansion).
    pub server_path: Option<String>,
    pub mode: Option<AccessMode>,
    pub timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
    pub skip_confirmation: Option<bool>,
    pub auto_start: Option<bool>,
    pub retry_backoff_ms: Option<u64>,
}

impl EngineOptions {
    /// Merge these options over `defaults`.
    pub fn apply(&self, defaults: EngineConfig) -> Result<EngineConfig, SettingsError> {
        let mut config = defaults;
        if let Some(path) = &self.server_path {
            config.server_path = Some(PathBuf::from(expand_env_vars(path)?));
        }
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(secs) = self.timeout_secs {
            if secs == 0 {
                return Err(SettingsError::InvalidConfig(
                    "timeout_secs must be greater than zero".to_string(),
                ));
            }
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = self.max_retries {
            config.max_retries = retries;
        }
        if let Some(skip) = self.skip_confirmation {
            config.skip_confirmation = skip;
        }
        if let Some(auto_start) = self.auto_start {
            config.auto_start = auto_start;
        }
        if let Some(ms) = self.retry_backoff_ms {
            config.retry_backoff = Duration::from_millis(ms);
        }
        Ok(config)
    }

    /// Layer `other` on top of `self`; fields set in `other` win.
    pub fn merged_with(&self, other: &EngineOptions) -> EngineOptions {
        EngineOptions {
            server_path: other.server_path.clone().or_else(|| self.server_path.clone()),
            mode: other.mode.or(self.mode),
            timeout_secs: other.timeout_secs.or(self.timeout_secs),
            max_retries: other.max_retries.or(self.max_retries),
            skip_confirmation: other.skip_confirmation.or(self.skip_confirmation),
            auto_start: other.auto_start.or(self.auto_start),
            retry_backoff_ms: other.retry_backoff_ms.or(self.retry_backoff_ms),
        }
    }
}

/// Per-call overrides accepted by `load`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoadOptions {
    pub mode: Option<AccessMode>,
    pub timeout: Option<Duration>,
}

impl LoadOptions {
    pub fn with_mode(mut self, mode: AccessMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
