// tests/normalize/records_test.rs
use modelwiki::metadata::{Column, CrossFilterDirection, Measure, Relationship};
use modelwiki::normalize::records::{
    decode_measure, decode_relationship, decode_table_refs, decode_table_schema,
};
use serde_json::json;

#[test]
fn test_measure_key_spellings_are_equivalent() {
    let capitalized = json!({
        "Name": "Total Sales",
        "Expression": "SUM(Sales[Amount])",
        "TableName": "Sales",
        "FormatString": "#,0.00",
        "DisplayFolder": "KPIs",
        "IsHidden": "false"
    });
    let snake = json!({
        "measure_name": "Total Sales",
        "expression": "SUM(Sales[Amount])",
        "table_name": "Sales",
        "format_string": "#,0.00",
        "display_folder": "KPIs",
        "is_hidden": false
    });

    let expected = Measure {
        name: "Total Sales".into(),
        table: "Sales".into(),
        expression: "SUM(Sales[Amount])".into(),
        description: None,
        format_string: Some("#,0.00".into()),
        display_folder: Some("KPIs".into()),
        is_hidden: false,
    };
    assert_eq!(decode_measure(&capitalized, "Other"), Some(expected.clone()));
    assert_eq!(decode_measure(&snake, "Other"), Some(expected));
}

#[test]
fn test_measure_without_name_is_skipped() {
    assert_eq!(decode_measure(&json!({"Expression": "1"}), "Sales"), None);
    assert_eq!(decode_measure(&json!("Total"), "Sales"), None);
}

#[test]
fn test_relationship_key_spellings_are_equivalent() {
    let camel = json!({
        "fromTable": "Sales", "fromColumn": "DateKey",
        "toTable": "Date", "toColumn": "DateKey",
        "isActive": true, "crossFilteringBehavior": "BothDirections"
    });
    let pascal = json!({
        "FromTable": "Sales", "FromColumn": "DateKey",
        "ToTable": "Date", "ToColumn": "DateKey",
        "IsActive": 1, "CrossFilteringBehavior": "both"
    });

    let expected = Relationship {
        from_table: "Sales".into(),
        from_column: "DateKey".into(),
        to_table: "Date".into(),
        to_column: "DateKey".into(),
        is_active: true,
        cross_filter: CrossFilterDirection::Both,
    };
    assert_eq!(decode_relationship(&camel), Some(expected.clone()));
    assert_eq!(decode_relationship(&pascal), Some(expected));
}

#[test]
fn test_inactive_relationship_is_kept() {
    let rel = decode_relationship(&json!({
        "from_table": "Sales", "from_column": "ShipDate",
        "to_table": "Date", "to_column": "DateKey",
        "is_active": "False"
    }))
    .unwrap();

    assert!(!rel.is_active);
    assert_eq!(rel.cross_filter, CrossFilterDirection::Single);
}

#[test]
fn test_schema_object_attributes_measures_to_table() {
    let payload = json!({
        "TableName": "Sales",
        "Columns": [
            {"Name": "Amount", "DataType": "Decimal"},
            {"name": "Secret", "dataType": "String", "isHidden": true}
        ],
        "Measures": [{"Name": "Total Sales", "Expression": "SUM(Sales[Amount])"}]
    });

    let schema = decode_table_schema("Sales", &payload);

    assert_eq!(
        schema.columns,
        vec![
            Column {
                name: "Amount".into(),
                data_type: "Decimal".into(),
                is_hidden: false
            },
            Column {
                name: "Secret".into(),
                data_type: "String".into(),
                is_hidden: true
            },
        ]
    );
    assert_eq!(schema.measures.len(), 1);
    assert_eq!(schema.measures[0].table, "Sales");
}

#[test]
fn test_schema_rows_from_column_listing() {
    let payload = json!([
        {"ColumnName": "DateKey", "PandasDataType": "int64"},
        "Year"
    ]);

    let schema = decode_table_schema("Date", &payload);

    assert_eq!(schema.columns.len(), 2);
    assert_eq!(schema.columns[0].data_type, "int64");
    assert_eq!(schema.columns[1].data_type, "string");
    assert!(schema.measures.is_empty());
}

#[test]
fn test_table_listing_shapes() {
    let tables = decode_table_refs(&[
        json!("Sales"),
        json!({"Name": "Date", "RowCount": "365"}),
        json!({"name": "Sales"}),
        json!({"description": "no name"}),
        json!(42),
    ]);

    let names: Vec<_> = tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Sales", "Date"]);
    assert_eq!(tables[1].row_count, Some(365));
}
