//! MetadataSource for modeling backends.
//!
//! These backends group operations into a handful of tools, each taking a
//! `{"request": {"operation": ..., "connectionName": ...}}` argument and
//! answering with a `{success, data, message}` wrapper.

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::provider::MetadataSource;
use super::types::{Relationship, Table};
use crate::engine::invoke::ToolInvoker;
use crate::error::EngineResult;
use crate::normalize::fields::{opt_str_field, str_field_or};
use crate::normalize::{records, TableSchema};

/// Tool names exposed by modeling backends.
pub mod tools {
    pub const CONNECTION: &str = "connection_operations";
    pub const MODEL: &str = "model_operations";
    pub const TABLE: &str = "table_operations";
    pub const RELATIONSHIP: &str = "relationship_operations";

    /// Assumed when the backend can't enumerate its tools.
    pub const DEFAULTS: &[&str] = &[CONNECTION, MODEL, TABLE, RELATIONSHIP];
}

/// Build a `{"request": {...}}` argument for `operation`.
pub fn request(operation: &str, fields: Map<String, Value>) -> Value {
    let mut request = Map::new();
    request.insert("operation".to_string(), Value::String(operation.to_string()));
    request.extend(fields);
    json!({ "request": request })
}

pub struct ModelingSource<'a> {
    invoker: ToolInvoker<'a>,
    connection_id: &'a str,
}

impl<'a> ModelingSource<'a> {
    pub fn new(invoker: ToolInvoker<'a>, connection_id: &'a str) -> Self {
        Self {
            invoker,
            connection_id,
        }
    }

    fn request(&self, operation: &str, extra: &[(&str, &str)]) -> Value {
        let mut fields = Map::new();
        fields.insert(
            "connectionName".to_string(),
            Value::String(self.connection_id.to_string()),
        );
        for (key, value) in extra {
            fields.insert(key.to_string(), Value::String(value.to_string()));
        }
        request(operation, fields)
    }
}

#[async_trait]
impl MetadataSource for ModelingSource<'_> {
    async fn summary(&self) -> EngineResult<Map<String, Value>> {
        let data = self
            .invoker
            .call_checked(tools::MODEL, self.request("Get", &[]))
            .await?
            .into_object();

        let mut summary = Map::new();
        summary.insert("name".into(), str_field_or(&data, &["name", "Name"], "Unknown").into());
        summary.insert(
            "description".into(),
            str_field_or(&data, &["description", "Description"], "").into(),
        );
        summary.insert("culture".into(), str_field_or(&data, &["culture", "Culture"], "").into());
        if let Some(level) = data
            .get("compatibilityLevel")
            .or_else(|| data.get("CompatibilityLevel"))
        {
            summary.insert("compatibilityLevel".into(), level.clone());
        }
        if let Some(modified) = opt_str_field(&data, &["lastUpdate", "LastUpdate", "modifiedTime"]) {
            summary.insert("lastUpdate".into(), modified.into());
        }
        Ok(summary)
    }

    async fn list_tables(&self) -> EngineResult<Vec<Table>> {
        let items = self
            .invoker
            .call_checked(tools::TABLE, self.request("List", &[]))
            .await?
            .into_list();
        Ok(records::decode_table_refs(&items))
    }

    async fn table_schema(&self, table: &str) -> EngineResult<TableSchema> {
        let response = self
            .invoker
            .call_checked(tools::TABLE, self.request("GetSchema", &[("tableName", table)]))
            .await?;
        Ok(records::decode_table_schema(table, &response.data))
    }

    async fn relationships(&self) -> EngineResult<Vec<Relationship>> {
        let items = self
            .invoker
            .call_checked(tools::RELATIONSHIP, self.request("List", &[]))
            .await?
            .into_list();
        Ok(records::decode_relationships(&items))
    }
}
