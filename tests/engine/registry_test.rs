// tests/engine/registry_test.rs
#[path = "../common/mod.rs"]
mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::{fake_binary, ok, operation, MockLauncher, Script};
use modelwiki::config::{AccessMode, EngineConfig, EngineOptions, LoadOptions};
use modelwiki::engine::{DiscoveryInputs, DocumentationEngine, LifecycleState, ModelingEngine};
use modelwiki::registry::{EngineRegistry, RegistryError};
use modelwiki::EngineError;
use serde_json::json;

fn script() -> Script {
    Script::new()
        .tools(&["connection_operations", "model_operations", "table_operations", "relationship_operations"])
        .handler(|tool, args| match (tool, operation(args)) {
            ("connection_operations", "Connect") => Ok(ok(json!({"connectionName": "c1"}))),
            ("model_operations", "Get") => Ok(ok(json!({"name": "Registry Model"}))),
            _ => Ok(ok(json!([]))),
        })
}

#[tokio::test]
async fn test_registered_engine_is_usable() {
    let binary = fake_binary();
    let launcher = MockLauncher::new(script());
    let mut registry = EngineRegistry::new();

    let engine_launcher = launcher.clone();
    registry
        .register("x", move |config| {
            Box::new(
                ModelingEngine::with_launcher(config, engine_launcher.clone())
                    .with_discovery(DiscoveryInputs::none()),
            )
        })
        .unwrap();

    let settings = EngineConfig::default()
        .with_server_path(&binary.path)
        .with_retry_backoff(Duration::ZERO);
    let mut engine = registry.get("x", settings).unwrap();

    assert_eq!(engine.state(), LifecycleState::Idle);
    engine.load("localhost:51174", LoadOptions::default()).await.unwrap();
    let metadata = engine.extract().await.unwrap();
    engine.close().await;

    assert_eq!(metadata.model_name(), Some("Registry Model"));
    assert_eq!(launcher.stats.launches(), 1);
}

#[test]
fn test_duplicate_registration_fails() {
    let mut registry = EngineRegistry::new();
    registry
        .register("x", |config| Box::new(ModelingEngine::new(config)))
        .unwrap();

    let err = registry
        .register("x", |config| Box::new(ModelingEngine::new(config)))
        .unwrap_err();

    assert_eq!(err, RegistryError::Duplicate("x".to_string()));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_unknown_engine_names_available_keys() {
    let registry = EngineRegistry::with_builtin();

    let err = registry.get("nope", EngineOptions::default()).err().unwrap();

    match err {
        EngineError::Registry(RegistryError::UnknownEngine { key, available }) => {
            assert_eq!(key, "nope");
            assert_eq!(available, vec!["mcp".to_string(), "pbixray".to_string()]);
        }
        other => panic!("expected unknown engine, got {other:?}"),
    }
}

#[test]
fn test_options_merge_over_registered_defaults() {
    let seen: Arc<Mutex<Option<EngineConfig>>> = Arc::new(Mutex::new(None));
    let mut registry = EngineRegistry::new();

    let defaults = EngineConfig::default()
        .with_timeout(Duration::from_secs(300))
        .with_max_retries(7);
    let captured = seen.clone();
    registry
        .register_with_defaults("x", defaults, move |config| {
            *captured.lock().unwrap() = Some(config.clone());
            Box::new(ModelingEngine::new(config))
        })
        .unwrap();

    let options = EngineOptions {
        mode: Some(AccessMode::ReadWrite),
        max_retries: Some(2),
        ..Default::default()
    };
    let engine = registry.get("x", options).unwrap();
    assert_eq!(engine.name(), "mcp");

    let config = seen.lock().unwrap().clone().unwrap();
    assert_eq!(config.mode, AccessMode::ReadWrite);
    assert_eq!(config.max_retries, 2);
    assert_eq!(config.timeout, Duration::from_secs(300));

    // Per-call options never overwrite the registered defaults.
    let stored = registry.defaults("x").unwrap();
    assert_eq!(stored.max_retries, 7);
    assert_eq!(stored.mode, EngineConfig::default().mode);
    assert!(registry.defaults("nope").is_none());
}

#[test]
fn test_full_config_bypasses_defaults() {
    let seen: Arc<Mutex<Option<EngineConfig>>> = Arc::new(Mutex::new(None));
    let mut registry = EngineRegistry::new();

    let captured = seen.clone();
    registry
        .register_with_defaults(
            "x",
            EngineConfig::default().with_max_retries(9),
            move |config| {
                *captured.lock().unwrap() = Some(config.clone());
                Box::new(ModelingEngine::new(config))
            },
        )
        .unwrap();

    let explicit = EngineConfig::default().with_max_retries(1);
    registry.get("x", explicit.clone()).unwrap();

    assert_eq!(seen.lock().unwrap().clone(), Some(explicit));
}

#[test]
fn test_registries_are_independent() {
    let mut first = EngineRegistry::with_builtin();
    let second = EngineRegistry::with_builtin();

    first
        .register("custom", |config| Box::new(ModelingEngine::new(config)))
        .unwrap();

    assert!(first.contains("custom"));
    assert!(!second.contains("custom"));
}
