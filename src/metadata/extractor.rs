//! Ordered metadata extraction over a [`MetadataSource`].

use futures::future::join_all;

use super::provider::MetadataSource;
use super::types::{Measure, ModelMetadata};
use crate::error::{EngineError, EngineResult};

/// Default number of concurrent per-table schema calls.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Tuning for [`extract_metadata`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Maximum in-flight schema calls. `1` is sequential.
    pub concurrency: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl ExtractOptions {
    pub fn sequential() -> Self {
        Self { concurrency: 1 }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}

/// Extract a whole model.
///
/// Summary, table listing and relationships are required: a failure in any
/// of them aborts with [`EngineError::Extraction`]. A failing per-table
/// schema call leaves that table with no columns and no measures. A failing
/// query-text call leaves `query_text` empty.
pub async fn extract_metadata<S>(source: &S, options: &ExtractOptions) -> EngineResult<ModelMetadata>
where
    S: MetadataSource + ?Sized,
{
    let summary = source
        .summary()
        .await
        .map_err(|e| EngineError::extraction("summary", e))?;

    let mut tables = source
        .list_tables()
        .await
        .map_err(|e| EngineError::extraction("tables", e))?;
    tracing::debug!(count = tables.len(), "listed tables");

    let mut schemas = Vec::with_capacity(tables.len());
    for chunk in tables.chunks(options.concurrency.max(1)) {
        let calls = chunk.iter().map(|table| source.table_schema(&table.name));
        schemas.extend(join_all(calls).await);
    }

    let mut embedded_measures: Vec<Measure> = Vec::new();
    for (table, schema) in tables.iter_mut().zip(schemas) {
        match schema {
            Ok(schema) => {
                if !schema.columns.is_empty() {
                    table.columns = schema.columns;
                }
                embedded_measures.extend(schema.measures);
            }
            Err(e) => {
                tracing::warn!(table = %table.name, error = %e, "schema call failed; table left empty");
                table.columns.clear();
            }
        }
    }

    let measures = match source.measures().await {
        Ok(Some(measures)) => measures,
        Ok(None) => embedded_measures,
        Err(e) => {
            tracing::warn!(error = %e, "measure listing failed; using per-table measures");
            embedded_measures
        }
    };

    let relationships = source
        .relationships()
        .await
        .map_err(|e| EngineError::extraction("relationships", e))?;

    let query_text = match source.query_text().await {
        Ok(text) => text.filter(|t| !t.trim().is_empty()),
        Err(e) => {
            tracing::warn!(error = %e, "query text unavailable");
            None
        }
    };

    tracing::info!(
        tables = tables.len(),
        measures = measures.len(),
        relationships = relationships.len(),
        "extracted model metadata"
    );

    Ok(ModelMetadata {
        summary,
        tables,
        measures,
        relationships,
        query_text,
    })
}
