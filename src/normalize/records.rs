//! Record decoders from decoded payloads into canonical metadata types.
//!
//! Key lists are in priority order: current camelCase spelling first, then
//! the capitalized and snake_case spellings older backends emit.

use serde_json::{Map, Value};

use super::fields::{bool_field, bool_field_or, list_field, opt_str_field, str_field, str_field_or, u64_field};
use crate::metadata::{Column, CrossFilterDirection, Measure, Relationship, Table};

pub const TABLE_NAME_KEYS: &[&str] = &["name", "Name", "TableName", "tableName", "table_name"];
pub const ROW_COUNT_KEYS: &[&str] = &["rowCount", "RowCount", "row_count", "rows"];

pub const COLUMN_NAME_KEYS: &[&str] = &["name", "Name", "ColumnName", "columnName", "column_name"];
pub const DATA_TYPE_KEYS: &[&str] = &["dataType", "DataType", "data_type", "PandasDataType", "type", "Type"];
pub const HIDDEN_KEYS: &[&str] = &["isHidden", "IsHidden", "is_hidden", "hidden"];

pub const MEASURE_NAME_KEYS: &[&str] = &["name", "Name", "MeasureName", "measureName", "measure_name"];
pub const MEASURE_TABLE_KEYS: &[&str] = &["table", "Table", "TableName", "tableName", "table_name"];
pub const EXPRESSION_KEYS: &[&str] = &["expression", "Expression", "formula", "Formula"];
pub const DESCRIPTION_KEYS: &[&str] = &["description", "Description"];
pub const FORMAT_STRING_KEYS: &[&str] = &["formatString", "FormatString", "format_string"];
pub const DISPLAY_FOLDER_KEYS: &[&str] = &["displayFolder", "DisplayFolder", "display_folder"];

pub const FROM_TABLE_KEYS: &[&str] = &["fromTable", "FromTable", "from_table"];
pub const FROM_COLUMN_KEYS: &[&str] = &["fromColumn", "FromColumn", "from_column"];
pub const TO_TABLE_KEYS: &[&str] = &["toTable", "ToTable", "to_table"];
pub const TO_COLUMN_KEYS: &[&str] = &["toColumn", "ToColumn", "to_column"];
pub const ACTIVE_KEYS: &[&str] = &["isActive", "IsActive", "is_active", "active"];
pub const CROSS_FILTER_KEYS: &[&str] = &[
    "crossFilteringBehavior",
    "CrossFilteringBehavior",
    "crossFilterDirection",
    "CrossFilterDirection",
    "cross_filtering_behavior",
    "cross_filter_direction",
];

pub const COLUMNS_KEYS: &[&str] = &["Columns", "columns", "Schema", "schema"];
pub const MEASURES_KEYS: &[&str] = &["Measures", "measures"];

/// Columns and measures for one table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableSchema {
    pub columns: Vec<Column>,
    pub measures: Vec<Measure>,
}

/// Decode a column. A bare string is a column name of type `string`.
pub fn decode_column(item: &Value) -> Option<Column> {
    match item {
        Value::String(name) if !name.is_empty() => Some(Column {
            name: name.clone(),
            data_type: "string".to_string(),
            is_hidden: false,
        }),
        Value::Object(obj) => {
            let name = str_field(obj, COLUMN_NAME_KEYS);
            if name.is_empty() {
                return None;
            }
            Some(Column {
                name,
                data_type: str_field_or(obj, DATA_TYPE_KEYS, "string"),
                is_hidden: bool_field(obj, HIDDEN_KEYS),
            })
        }
        _ => None,
    }
}

/// Decode a measure, attributing it to `default_table` when the record
/// carries no table of its own.
pub fn decode_measure(item: &Value, default_table: &str) -> Option<Measure> {
    let obj = item.as_object()?;
    let name = str_field(obj, MEASURE_NAME_KEYS);
    if name.is_empty() {
        return None;
    }
    Some(Measure {
        name,
        table: str_field_or(obj, MEASURE_TABLE_KEYS, default_table),
        expression: str_field(obj, EXPRESSION_KEYS),
        description: opt_str_field(obj, DESCRIPTION_KEYS),
        format_string: opt_str_field(obj, FORMAT_STRING_KEYS),
        display_folder: opt_str_field(obj, DISPLAY_FOLDER_KEYS),
        is_hidden: bool_field(obj, HIDDEN_KEYS),
    })
}

pub fn decode_relationship(item: &Value) -> Option<Relationship> {
    let obj = item.as_object()?;
    let from_table = str_field(obj, FROM_TABLE_KEYS);
    let to_table = str_field(obj, TO_TABLE_KEYS);
    if from_table.is_empty() && to_table.is_empty() {
        return None;
    }
    Some(Relationship {
        from_table,
        from_column: str_field(obj, FROM_COLUMN_KEYS),
        to_table,
        to_column: str_field(obj, TO_COLUMN_KEYS),
        is_active: bool_field_or(obj, ACTIVE_KEYS, true),
        cross_filter: opt_str_field(obj, CROSS_FILTER_KEYS)
            .map(|s| CrossFilterDirection::parse_lenient(&s))
            .unwrap_or_default(),
    })
}

pub fn decode_columns(items: &[Value]) -> Vec<Column> {
    decode_all(items, "column", decode_column)
}

pub fn decode_measures(items: &[Value], default_table: &str) -> Vec<Measure> {
    decode_all(items, "measure", |item| decode_measure(item, default_table))
}

pub fn decode_relationships(items: &[Value]) -> Vec<Relationship> {
    decode_all(items, "relationship", decode_relationship)
}

/// Decode a table listing. Items may be names or objects; duplicates keep
/// the first occurrence.
pub fn decode_table_refs(items: &[Value]) -> Vec<Table> {
    let mut tables: Vec<Table> = Vec::with_capacity(items.len());
    for item in items {
        let table = match item {
            Value::String(name) if !name.is_empty() => Table::new(name.as_str()),
            Value::Object(obj) => {
                let name = str_field(obj, TABLE_NAME_KEYS);
                if name.is_empty() {
                    tracing::debug!("skipping unnamed table entry");
                    continue;
                }
                Table {
                    name,
                    columns: decode_columns(list_field(obj, COLUMNS_KEYS)),
                    row_count: u64_field(obj, ROW_COUNT_KEYS),
                }
            }
            _ => continue,
        };
        if tables.iter().any(|t| t.name == table.name) {
            tracing::debug!(table = %table.name, "skipping duplicate table entry");
            continue;
        }
        tables.push(table);
    }
    tables
}

/// Decode a per-table schema payload: either a bare column list, or an
/// object carrying `Columns` and `Measures` lists.
pub fn decode_table_schema(table: &str, payload: &Value) -> TableSchema {
    match payload {
        Value::Array(items) => TableSchema {
            columns: decode_columns(items),
            measures: Vec::new(),
        },
        Value::Object(obj) => schema_from_object(table, obj),
        Value::Null => TableSchema::default(),
        other => {
            tracing::warn!(table, kind = super::json_kind(other), "unexpected schema payload");
            TableSchema::default()
        }
    }
}

fn schema_from_object(table: &str, obj: &Map<String, Value>) -> TableSchema {
    TableSchema {
        columns: decode_columns(list_field(obj, COLUMNS_KEYS)),
        measures: decode_measures(list_field(obj, MEASURES_KEYS), table),
    }
}

fn decode_all<T>(items: &[Value], kind: &'static str, decode: impl Fn(&Value) -> Option<T>) -> Vec<T> {
    let decoded: Vec<T> = items.iter().filter_map(decode).collect();
    if decoded.len() < items.len() {
        tracing::debug!(kind, skipped = items.len() - decoded.len(), "skipped undecodable records");
    }
    decoded
}
