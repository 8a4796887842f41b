//! # modelwiki
//!
//! Extraction layer for documenting analytical data models through pluggable
//! tool-server backends.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  EngineRegistry                          │
//! │        (key → constructor, e.g. "mcp", "pbixray")        │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [load]
//! ┌─────────────────────────────────────────────────────────┐
//! │              ConnectionManager (lifecycle)               │
//! │  discover → launch → handshake → tools → bind source     │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [extract]
//! ┌─────────────────────────────────────────────────────────┐
//! │       MetadataSource → ToolInvoker → normalize           │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │                    ModelMetadata                         │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod metadata;
pub mod normalize;
pub mod registry;
pub mod transport;

pub use config::{AccessMode, EngineConfig, EngineOptions, LoadOptions, Settings};
pub use engine::{document, with_engine, DocumentationEngine, LifecycleState, SourceKind};
pub use error::{EngineError, EngineResult};
pub use metadata::{Column, CrossFilterDirection, ExtractOptions, Measure, ModelMetadata, Relationship, Table};
pub use registry::{EngineRegistry, EngineSettings, RegistryError};
