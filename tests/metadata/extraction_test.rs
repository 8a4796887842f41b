// tests/metadata/extraction_test.rs
#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;

use common::{content_envelope, fake_binary, ok, operation, test_config, FakeBinary, MockLauncher, Script};
use modelwiki::config::LoadOptions;
use modelwiki::engine::pbixray::PbixRayBackend;
use modelwiki::engine::{DiscoveryInputs, DocumentationEngine, LifecycleState, ModelingEngine, PbixRayEngine};
use modelwiki::transport::TransportError;
use modelwiki::{CrossFilterDirection, EngineError};
use serde_json::{json, Value};

const PBIXRAY_TOOLS: &[&str] = &[
    "load_pbix",
    "get_model_summary",
    "get_tables",
    "get_schema",
    "get_measures",
    "get_relationships",
    "get_power_query",
];

fn tool_error(message: &str) -> Value {
    json!({"content": [{"type": "text", "text": message}], "isError": true})
}

fn pbixray_engine(binary: &FakeBinary, script: Script) -> (PbixRayEngine, Arc<MockLauncher>) {
    let launcher = MockLauncher::new(script);
    let engine = PbixRayEngine::with_launcher(test_config(binary), launcher.clone())
        .with_backend(PbixRayBackend::new("python", None));
    (engine, launcher)
}

fn pbix_file(binary: &FakeBinary) -> String {
    let path = binary.dir.path().join("sales.pbix");
    std::fs::write(&path, b"PK").unwrap();
    path.display().to_string()
}

fn pbixray_handler(tool: &str, args: &Value) -> Result<Value, TransportError> {
    Ok(match tool {
        "load_pbix" => json!({"content": [{"type": "text", "text": "Successfully loaded sales.pbix"}]}),
        "get_model_summary" => content_envelope(&json!({"name": "Sales", "tables": 3})),
        "get_tables" => json!({"content": [{"type": "text", "text": "<class 'list'>\n['Sales', 'Date', 'Product']"}]}),
        "get_schema" => match args["table_name"].as_str() {
            Some("Date") => tool_error("schema unavailable for Date"),
            Some(table) => content_envelope(&json!([
                {"ColumnName": format!("{table}Key"), "PandasDataType": "int64"},
                {"ColumnName": "Name", "PandasDataType": "object"}
            ])),
            None => tool_error("table_name is required"),
        },
        "get_measures" => json!([
            {"TableName": "Sales", "Name": "Total Sales", "Expression": "SUM(Sales[Amount])"},
            {"TableName": "Sales", "Name": "Orders", "Expression": "COUNTROWS(Sales)", "DisplayFolder": "Counts"}
        ]),
        "get_relationships" => json!({"content": [{"type": "text", "text":
            "[{'FromTableName': 'x'}, {'FromTable': 'Sales', 'FromColumn': 'DateKey', 'ToTable': 'Date', 'ToColumn': 'DateKey', 'IsActive': True, 'CrossFilteringBehavior': 'BothDirections'}]"
        }]}),
        "get_power_query" => content_envelope(&json!("let Source = Sql.Database(\"srv\", \"db\") in Source")),
        _ => tool_error("unknown tool"),
    })
}

#[tokio::test]
async fn test_pbixray_extraction_with_partial_schema_failure() {
    let binary = fake_binary();
    let pbix = pbix_file(&binary);
    let (mut engine, launcher) = pbixray_engine(
        &binary,
        Script::new().tools(PBIXRAY_TOOLS).handler(pbixray_handler),
    );

    engine.load(&pbix, LoadOptions::default()).await.unwrap();
    let metadata = engine.extract().await.unwrap();
    engine.close().await;

    assert_eq!(metadata.model_name(), Some("Sales"));
    let names: Vec<_> = metadata.tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Sales", "Date", "Product"]);

    assert_eq!(metadata.table("Sales").unwrap().columns.len(), 2);
    assert_eq!(metadata.table("Sales").unwrap().columns[0].name, "SalesKey");
    assert!(metadata.table("Date").unwrap().columns.is_empty());
    assert_eq!(metadata.table("Product").unwrap().columns.len(), 2);

    assert_eq!(metadata.measures.len(), 2);
    assert_eq!(metadata.measures_for("Sales").count(), 2);
    assert_eq!(metadata.measures[1].display_folder.as_deref(), Some("Counts"));

    // The record without a usable table pair is dropped.
    assert_eq!(metadata.relationships.len(), 1);
    assert_eq!(metadata.relationships[0].cross_filter, CrossFilterDirection::Both);
    assert!(metadata.query_text.unwrap().contains("Sql.Database"));

    let load = launcher.stats.calls_to("load_pbix");
    assert_eq!(load, vec![json!({"file_path": pbix})]);
    assert_eq!(launcher.stats.calls_to("get_schema").len(), 3);
    assert_eq!(launcher.stats.leaked(), 0);
}

#[tokio::test]
async fn test_pbixray_power_query_only_when_advertised() {
    let binary = fake_binary();
    let pbix = pbix_file(&binary);
    let tools: Vec<&str> = PBIXRAY_TOOLS.iter().copied().filter(|t| *t != "get_power_query").collect();
    let (mut engine, launcher) = pbixray_engine(&binary, Script::new().tools(&tools).handler(pbixray_handler));

    engine.load(&pbix, LoadOptions::default()).await.unwrap();
    let metadata = engine.extract().await.unwrap();
    engine.close().await;

    assert!(metadata.query_text.is_none());
    assert!(launcher.stats.calls_to("get_power_query").is_empty());
}

#[tokio::test]
async fn test_pbixray_missing_file_is_source_error() {
    let binary = fake_binary();
    let (mut engine, launcher) = pbixray_engine(
        &binary,
        Script::new().tools(PBIXRAY_TOOLS).handler(pbixray_handler),
    );

    let missing = binary.dir.path().join("missing.pbix");
    let err = engine
        .load(missing.to_str().unwrap(), LoadOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "source");
    assert_eq!(engine.state(), LifecycleState::Failed);
    assert!(launcher.stats.calls_to("load_pbix").is_empty());
    assert_eq!(launcher.stats.teardowns(), 1);
}

#[tokio::test]
async fn test_pbixray_load_tool_error_is_source_error() {
    let binary = fake_binary();
    let pbix = pbix_file(&binary);
    let (mut engine, launcher) = pbixray_engine(
        &binary,
        Script::new().tools(PBIXRAY_TOOLS).handler(|tool, args| match tool {
            "load_pbix" => Ok(tool_error("File is not a valid pbix archive")),
            _ => pbixray_handler(tool, args),
        }),
    );

    let err = engine.load(&pbix, LoadOptions::default()).await.unwrap_err();

    assert_eq!(err.kind(), "source");
    assert!(err.to_string().contains("not a valid pbix archive"), "{err}");
    assert_eq!(engine.state(), LifecycleState::Failed);
    assert_eq!(launcher.stats.teardowns(), 1);
}

fn modeling_script(fail_relationships: bool) -> Script {
    Script::new()
        .tools(&["connection_operations", "model_operations", "table_operations", "relationship_operations"])
        .handler(move |tool, args| {
            Ok(match (tool, operation(args)) {
                ("connection_operations", "Connect") => ok(json!({"connectionName": "c1"})),
                ("connection_operations", _) => ok(json!({})),
                ("model_operations", "Get") => ok(json!({"name": "Sales Model", "culture": "en-US"})),
                ("table_operations", "List") => ok(json!([{"name": "Sales"}, {"name": "Date"}])),
                ("table_operations", "GetSchema") => match args["request"]["tableName"].as_str() {
                    Some("Date") => json!({"success": false, "message": "table is being processed"}),
                    _ => ok(json!({
                        "TableName": "Sales",
                        "Columns": [{"Name": "Amount", "DataType": "Decimal"}],
                        "Measures": [{"Name": "Total Sales", "Expression": "SUM(Sales[Amount])"}]
                    })),
                },
                ("relationship_operations", "List") if fail_relationships => {
                    json!({"success": false, "message": "relationship listing unavailable"})
                }
                ("relationship_operations", "List") => ok(json!([])),
                _ => json!({"success": false, "message": "unsupported"}),
            })
        })
}

#[tokio::test]
async fn test_modeling_rejected_schema_leaves_table_empty() {
    let binary = fake_binary();
    let launcher = MockLauncher::new(modeling_script(false));
    let mut engine = ModelingEngine::with_launcher(test_config(&binary), launcher.clone())
        .with_discovery(DiscoveryInputs::none());

    engine.load("localhost:51174", LoadOptions::default()).await.unwrap();
    let metadata = engine.extract().await.unwrap();
    engine.close().await;

    assert_eq!(metadata.summary["culture"], "en-US");
    assert_eq!(metadata.table("Sales").unwrap().columns.len(), 1);
    assert!(metadata.table("Date").unwrap().columns.is_empty());
    assert_eq!(metadata.measures.len(), 1);
    assert_eq!(metadata.measures[0].table, "Sales");

    for args in launcher.stats.calls_to("table_operations") {
        assert_eq!(args["request"]["connectionName"], "c1");
    }
}

#[tokio::test]
async fn test_modeling_relationship_failure_aborts_extraction() {
    let binary = fake_binary();
    let launcher = MockLauncher::new(modeling_script(true));
    let mut engine = ModelingEngine::with_launcher(test_config(&binary), launcher.clone())
        .with_discovery(DiscoveryInputs::none());

    engine.load("localhost:51174", LoadOptions::default()).await.unwrap();
    let err = engine.extract().await.unwrap_err();

    match err {
        EngineError::Extraction { step, message } => {
            assert_eq!(step, "relationships");
            assert!(message.contains("relationship listing unavailable"), "{message}");
        }
        other => panic!("expected extraction error, got {other:?}"),
    }
    // A failed extraction leaves the connection usable.
    assert_eq!(engine.state(), LifecycleState::Ready);
    engine.close().await;
    assert_eq!(launcher.stats.leaked(), 0);
}
