//! MetadataSource trait definition.
//!
//! A MetadataSource is one backend's view of a bound model. Each method maps
//! to a single tool call; orchestration lives in [`extract_metadata`].
//!
//! [`extract_metadata`]: super::extract_metadata

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::types::{Measure, Relationship, Table};
use crate::error::EngineResult;
use crate::normalize::TableSchema;

/// Read-only access to a bound model.
///
/// # Example
///
/// ```ignore
/// use modelwiki::metadata::MetadataSource;
///
/// async fn table_names(source: &impl MetadataSource) -> EngineResult<Vec<String>> {
///     let tables = source.list_tables().await?;
///     Ok(tables.into_iter().map(|t| t.name).collect())
/// }
/// ```
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Free-form model summary.
    async fn summary(&self) -> EngineResult<Map<String, Value>>;

    /// Tables in the model, in backend order. Columns may be empty until
    /// [`table_schema`](Self::table_schema) is called.
    async fn list_tables(&self) -> EngineResult<Vec<Table>>;

    /// Columns and embedded measures for one table.
    async fn table_schema(&self, table: &str) -> EngineResult<TableSchema>;

    async fn relationships(&self) -> EngineResult<Vec<Relationship>>;

    /// Model-wide measure listing, for backends that don't embed measures in
    /// the per-table schema.
    async fn measures(&self) -> EngineResult<Option<Vec<Measure>>> {
        Ok(None)
    }

    /// Raw query / source-definition text.
    async fn query_text(&self) -> EngineResult<Option<String>> {
        Ok(None)
    }
}
