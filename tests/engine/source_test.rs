// tests/engine/source_test.rs
#[path = "../common/mod.rs"]
mod common;

use common::{fake_binary, ok, operation, test_config, MockLauncher, Script};
use modelwiki::config::LoadOptions;
use modelwiki::engine::{DiscoveryInputs, DocumentationEngine, ModelingEngine, SourceError, SourceKind};
use serde_json::json;

#[test]
fn test_existing_directory_is_folder() {
    let dir = tempfile::tempdir().unwrap();
    let model = dir.path().join("Sales.SemanticModel");
    std::fs::create_dir(&model).unwrap();

    let kind = SourceKind::classify(model.to_str().unwrap()).unwrap();

    assert_eq!(kind, SourceKind::Folder(model.clone()));
    assert_eq!(
        kind.connect_request(),
        json!({"request": {"operation": "ConnectFolder", "folderPath": model.display().to_string()}})
    );
}

#[test]
fn test_surrounding_whitespace_is_ignored() {
    let kind = SourceKind::classify("  localhost:51174\n").unwrap();
    assert_eq!(kind, SourceKind::ConnectionString("localhost:51174".into()));
}

#[test]
fn test_scheme_uri_is_remote() {
    let uri = "powerbi://api.powerbi.com/v1.0/myorg/Sales Workspace";
    // Whitespace inside the path is not a URI.
    assert!(SourceKind::classify(uri).is_err());

    let uri = "powerbi://api.powerbi.com/v1.0/myorg/Sales";
    let kind = SourceKind::classify(uri).unwrap();
    assert_eq!(kind, SourceKind::RemoteUri(uri.into()));
    assert_eq!(kind.operation(), "ConnectFabric");
}

#[test]
fn test_host_port_and_connection_strings() {
    for input in [
        "localhost:51174",
        "127.0.0.1:2383",
        "Data Source=localhost:51174",
        "Provider=MSOLAP;Data Source=localhost:51174;Initial Catalog=Sales",
    ] {
        let kind = SourceKind::classify(input).unwrap();
        assert_eq!(kind, SourceKind::ConnectionString(input.into()), "{input}");
        assert_eq!(kind.operation(), "Connect");
    }
}

#[test]
fn test_unclassifiable_inputs() {
    for input in ["", "sales model", "/no/such/model/folder", "localhost:port", "Catalog=Sales"] {
        assert!(
            matches!(SourceKind::classify(input), Err(SourceError::Unclassifiable(_))),
            "{input}"
        );
    }
}

#[tokio::test]
async fn test_load_sends_classified_connect_request() {
    let binary = fake_binary();
    let launcher = MockLauncher::new(
        Script::new()
            .tools(&["connection_operations"])
            .handler(|_, _| Ok(ok(json!({"connectionName": "remote-1"})))),
    );
    let mut engine = ModelingEngine::with_launcher(test_config(&binary), launcher.clone())
        .with_discovery(DiscoveryInputs::none());

    engine
        .load("powerbi://api.powerbi.com/v1.0/myorg/Sales", LoadOptions::default())
        .await
        .unwrap();

    let calls = launcher.stats.calls_to("connection_operations");
    assert_eq!(calls.len(), 1);
    assert_eq!(operation(&calls[0]), "ConnectFabric");
    assert_eq!(calls[0]["request"]["dataSource"], "powerbi://api.powerbi.com/v1.0/myorg/Sales");
    assert_eq!(engine.connection_id(), Some("remote-1"));
    engine.close().await;
}

#[tokio::test]
async fn test_connect_without_name_uses_default() {
    let binary = fake_binary();
    let launcher = MockLauncher::new(
        Script::new()
            .tools(&["connection_operations"])
            .handler(|_, _| Ok(json!({"success": true, "message": "connected"}))),
    );
    let mut engine = ModelingEngine::with_launcher(test_config(&binary), launcher.clone())
        .with_discovery(DiscoveryInputs::none());

    engine.load("localhost:51174", LoadOptions::default()).await.unwrap();

    assert_eq!(engine.connection_id(), Some("default"));
    engine.close().await;
}
