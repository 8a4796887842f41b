//! Engine error taxonomy.
//!
//! Every variant keeps the originating backend message so it can be shown to
//! the user as-is.

use thiserror::Error;

use crate::config::SettingsError;
use crate::engine::discovery::DiscoveryError;
use crate::engine::lifecycle::LifecycleState;
use crate::engine::source::SourceError;
use crate::registry::RegistryError;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced by documentation engines.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No valid backend binary could be located.
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    /// Launch or handshake failed after exhausting retries, or hit a
    /// non-retryable fault.
    #[error("failed to connect to backend after {attempts} attempt(s): {message}")]
    Connection { attempts: u32, message: String },

    /// The source could not be classified or the backend rejected it.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// A response could not be interpreted even by the tolerant normalizer.
    #[error("protocol error from tool `{tool}`: {message}")]
    Protocol { tool: String, message: String },

    /// A whole-model extraction call failed.
    #[error("extraction failed while reading {step}: {message}")]
    Extraction { step: &'static str, message: String },

    /// Operation issued in the wrong lifecycle state.
    #[error("cannot {operation} while engine is {actual} (requires {expected})")]
    State {
        operation: &'static str,
        expected: &'static str,
        actual: LifecycleState,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Config(#[from] SettingsError),
}

impl EngineError {
    pub fn connection(attempts: u32, message: impl ToString) -> Self {
        Self::Connection {
            attempts,
            message: message.to_string(),
        }
    }

    pub fn protocol(tool: impl Into<String>, message: impl ToString) -> Self {
        Self::Protocol {
            tool: tool.into(),
            message: message.to_string(),
        }
    }

    pub fn extraction(step: &'static str, message: impl ToString) -> Self {
        Self::Extraction {
            step,
            message: message.to_string(),
        }
    }

    pub fn state(operation: &'static str, expected: &'static str, actual: LifecycleState) -> Self {
        Self::State {
            operation,
            expected,
            actual,
        }
    }

    /// Short name of the error kind, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Discovery(_) => "discovery",
            EngineError::Connection { .. } => "connection",
            EngineError::Source(_) => "source",
            EngineError::Protocol { .. } => "protocol",
            EngineError::Extraction { .. } => "extraction",
            EngineError::State { .. } => "state",
            EngineError::Registry(_) => "registry",
            EngineError::Config(_) => "config",
        }
    }
}
