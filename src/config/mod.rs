//! Configuration module for modelwiki.
//!
//! Handles per-engine configuration, load-time overrides, and the settings file.

mod engine;
mod settings;

pub use engine::{AccessMode, EngineConfig, EngineOptions, LoadOptions};
pub use settings::{expand_env_vars, EngineSelection, ExtractSettings, Settings, SettingsError};
