//! Canonical model metadata types.
//!
//! These are the only structures handed to callers. Backend-specific shapes
//! never leak past the normalizer.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Everything extracted from one model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Free-form model summary (name, description, culture, ...).
    pub summary: Map<String, Value>,
    pub tables: Vec<Table>,
    pub measures: Vec<Measure>,
    pub relationships: Vec<Relationship>,
    /// Raw query / source-definition text, for backends that expose it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_text: Option<String>,
}

impl ModelMetadata {
    /// Look up a table by name.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Measures owned by `table`.
    pub fn measures_for<'a>(&'a self, table: &'a str) -> impl Iterator<Item = &'a Measure> + 'a {
        self.measures.iter().filter(move |m| m.table == table)
    }

    /// Model name from the summary, if present.
    pub fn model_name(&self) -> Option<&str> {
        self.summary.get("name").and_then(Value::as_str)
    }

    /// Table names referenced by measures or relationships that are not in
    /// `tables`. Backends are allowed to produce these.
    pub fn dangling_table_refs(&self) -> Vec<&str> {
        let mut refs: Vec<&str> = self
            .measures
            .iter()
            .map(|m| m.table.as_str())
            .chain(
                self.relationships
                    .iter()
                    .flat_map(|r| [r.from_table.as_str(), r.to_table.as_str()]),
            )
            .filter(|name| !name.is_empty() && self.table(name).is_none())
            .collect();
        refs.sort_unstable();
        refs.dedup();
        refs
    }
}

/// A table and its columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u64>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// A column descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: String,
    #[serde(default)]
    pub is_hidden: bool,
}

/// A calculated measure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measure {
    pub name: String,
    /// Owning table. May not match any extracted table.
    pub table: String,
    pub expression: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_folder: Option<String>,
    #[serde(default)]
    pub is_hidden: bool,
}

/// A relationship between two table columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
    pub is_active: bool,
    pub cross_filter: CrossFilterDirection,
}

/// Cross-filter behavior of a relationship.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrossFilterDirection {
    #[default]
    Single,
    Both,
    Automatic,
    None,
}

impl CrossFilterDirection {
    /// Parse a backend spelling; anything unknown maps to `Single`.
    pub fn parse_lenient(s: &str) -> Self {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "both" | "bothdirections" | "bidirectional" | "bi" | "2" => CrossFilterDirection::Both,
            "automatic" | "auto" | "3" => CrossFilterDirection::Automatic,
            "none" => CrossFilterDirection::None,
            _ => CrossFilterDirection::Single,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CrossFilterDirection::Single => "Single",
            CrossFilterDirection::Both => "Both",
            CrossFilterDirection::Automatic => "Automatic",
            CrossFilterDirection::None => "None",
        }
    }
}

impl fmt::Display for CrossFilterDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
