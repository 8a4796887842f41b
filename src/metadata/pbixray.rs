//! MetadataSource for pbixray backends.
//!
//! Flat tools with snake_case arguments; payloads are usually bare lists or
//! objects, sometimes literal-encoded.

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::provider::MetadataSource;
use super::types::{Measure, Relationship, Table};
use crate::engine::invoke::ToolInvoker;
use crate::error::EngineResult;
use crate::normalize::{records, TableSchema};

/// Tool names exposed by pbixray backends.
pub mod tools {
    pub const LOAD_PBIX: &str = "load_pbix";
    pub const MODEL_SUMMARY: &str = "get_model_summary";
    pub const TABLES: &str = "get_tables";
    pub const SCHEMA: &str = "get_schema";
    pub const MEASURES: &str = "get_measures";
    pub const RELATIONSHIPS: &str = "get_relationships";
    pub const POWER_QUERY: &str = "get_power_query";

    /// Assumed when the backend can't enumerate its tools. `get_power_query`
    /// is left out so it is only called when advertised.
    pub const DEFAULTS: &[&str] = &[LOAD_PBIX, MODEL_SUMMARY, TABLES, SCHEMA, MEASURES, RELATIONSHIPS];
}

pub struct PbixRaySource<'a> {
    invoker: ToolInvoker<'a>,
}

impl<'a> PbixRaySource<'a> {
    pub fn new(invoker: ToolInvoker<'a>) -> Self {
        Self { invoker }
    }
}

#[async_trait]
impl MetadataSource for PbixRaySource<'_> {
    async fn summary(&self) -> EngineResult<Map<String, Value>> {
        let response = self.invoker.call_checked(tools::MODEL_SUMMARY, json!({})).await?;
        Ok(match response.data {
            Value::Object(obj) => obj,
            Value::Null => Map::new(),
            other => {
                let mut summary = Map::new();
                summary.insert("summary".into(), other);
                summary
            }
        })
    }

    async fn list_tables(&self) -> EngineResult<Vec<Table>> {
        let items = self.invoker.call_checked(tools::TABLES, json!({})).await?.into_list();
        Ok(records::decode_table_refs(&items))
    }

    async fn table_schema(&self, table: &str) -> EngineResult<TableSchema> {
        let response = self
            .invoker
            .call_checked(tools::SCHEMA, json!({ "table_name": table }))
            .await?;
        Ok(records::decode_table_schema(table, &response.data))
    }

    async fn relationships(&self) -> EngineResult<Vec<Relationship>> {
        let items = self
            .invoker
            .call_checked(tools::RELATIONSHIPS, json!({}))
            .await?
            .into_list();
        Ok(records::decode_relationships(&items))
    }

    async fn measures(&self) -> EngineResult<Option<Vec<Measure>>> {
        let items = self.invoker.call_checked(tools::MEASURES, json!({})).await?.into_list();
        Ok(Some(records::decode_measures(&items, "")))
    }

    async fn query_text(&self) -> EngineResult<Option<String>> {
        if !self.invoker.supports(tools::POWER_QUERY) {
            return Ok(None);
        }
        let response = self.invoker.call_checked(tools::POWER_QUERY, json!({})).await?;
        Ok(match response.data {
            Value::Null => None,
            Value::String(text) => Some(text),
            other => Some(serde_json::to_string_pretty(&other).unwrap_or_else(|_| other.to_string())),
        })
    }
}
