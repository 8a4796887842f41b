//! Model metadata extraction.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      extract_metadata()                         │
//! │   summary → tables → schema per table (bounded join_all)        │
//! │           → measures → relationships → query text               │
//! └─────────────────────────────────────────────────────────────────┘
//!                           │
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      MetadataSource                             │
//! │   ModelingSource (grouped *_operations tools)                   │
//! │   PbixRaySource  (flat get_* tools)                             │
//! └─────────────────────────────────────────────────────────────────┘
//!                           │
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │               ToolInvoker → Transport (JSON-RPC over stdio)     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

mod extractor;
pub mod modeling;
pub mod pbixray;
mod provider;
mod types;

pub use extractor::{extract_metadata, ExtractOptions, DEFAULT_CONCURRENCY};
pub use modeling::ModelingSource;
pub use pbixray::PbixRaySource;
pub use provider::MetadataSource;
pub use types::*;
