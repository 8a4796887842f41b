//! Documentation engines.
//!
//! An engine owns one backend connection and exposes three lifecycle
//! operations: [`load`](DocumentationEngine::load),
//! [`extract`](DocumentationEngine::extract) and
//! [`close`](DocumentationEngine::close).
//!
//! # Example
//!
//! ```ignore
//! use modelwiki::config::{EngineConfig, LoadOptions};
//! use modelwiki::engine::{self, ModelingEngine};
//!
//! let mut engine = ModelingEngine::new(EngineConfig::default());
//! let metadata = engine::document(&mut engine, "./Sales.SemanticModel", LoadOptions::default()).await?;
//! println!("{} tables", metadata.tables.len());
//! ```

pub mod connection;
pub mod discovery;
pub mod invoke;
pub mod lifecycle;
pub mod modeling;
pub mod pbixray;
pub mod source;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::config::LoadOptions;
use crate::error::EngineResult;
use crate::metadata::{ExtractOptions, ModelMetadata};

pub use connection::{Backend, ConnectionManager, ConnectionState};
pub use discovery::{DiscoveryError, DiscoveryInputs};
pub use invoke::{ToolInvoker, ToolSet};
pub use lifecycle::{Lifecycle, LifecycleState};
pub use modeling::ModelingEngine;
pub use pbixray::PbixRayEngine;
pub use source::{SourceError, SourceKind};

/// A backend capable of documenting one model at a time.
///
/// Instances are not reentrant: a `load` on an engine that is not idle or
/// closed returns a state error.
#[async_trait]
pub trait DocumentationEngine: Send {
    /// Registry key of this engine.
    fn name(&self) -> &str;

    fn state(&self) -> LifecycleState;

    /// Tuning for subsequent `extract` calls.
    fn set_extract_options(&mut self, options: ExtractOptions);

    /// Launch the backend and bind `source`.
    async fn load(&mut self, source: &str, options: LoadOptions) -> EngineResult<()>;

    /// Extract the bound model. Requires a prior successful `load`.
    async fn extract(&mut self) -> EngineResult<ModelMetadata>;

    /// Release the backend. Never fails; safe to call repeatedly.
    async fn close(&mut self);
}

/// Load `source`, run `f`, and close the engine whatever the outcome.
pub async fn with_engine<E, T, F>(engine: &mut E, source: &str, options: LoadOptions, f: F) -> EngineResult<T>
where
    E: DocumentationEngine + ?Sized + 'static,
    F: for<'a> FnOnce(&'a mut E) -> BoxFuture<'a, EngineResult<T>>,
{
    let result = match engine.load(source, options).await {
        Ok(()) => f(&mut *engine).await,
        Err(e) => Err(e),
    };
    engine.close().await;
    result
}

/// Load, extract and close in one call.
pub async fn document<E>(engine: &mut E, source: &str, options: LoadOptions) -> EngineResult<ModelMetadata>
where
    E: DocumentationEngine + ?Sized + 'static,
{
    with_engine(engine, source, options, |engine| engine.extract()).await
}
