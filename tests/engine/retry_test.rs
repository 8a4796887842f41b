// tests/engine/retry_test.rs
#[path = "../common/mod.rs"]
mod common;

use common::{fake_binary, ok, test_config, MockLauncher, Script, Step};
use modelwiki::config::LoadOptions;
use modelwiki::engine::{DiscoveryInputs, DocumentationEngine, LifecycleState, ModelingEngine};
use modelwiki::EngineError;
use serde_json::json;

fn connecting_script() -> Script {
    Script::new()
        .tools(&["connection_operations", "model_operations", "table_operations"])
        .handler(|_, _| Ok(ok(json!({"connectionName": "c1"}))))
}

#[tokio::test]
async fn test_transient_handshake_timeouts_recover() {
    let binary = fake_binary();
    let launcher = MockLauncher::new(connecting_script().handshakes([Step::Timeout, Step::Timeout]));
    let config = test_config(&binary).with_max_retries(3);
    let mut engine =
        ModelingEngine::with_launcher(config, launcher.clone()).with_discovery(DiscoveryInputs::none());

    engine.load("localhost:51174", LoadOptions::default()).await.unwrap();

    assert_eq!(engine.state(), LifecycleState::Ready);
    assert_eq!(launcher.stats.launches(), 3);
    // The two timed-out transports were torn down before retrying.
    assert_eq!(launcher.stats.teardowns(), 2);
    assert_eq!(launcher.stats.leaked(), 0);

    engine.close().await;
    assert_eq!(launcher.stats.teardowns(), 3);
    assert_eq!(launcher.stats.leaked(), 0);
}

#[tokio::test]
async fn test_transient_launch_timeout_recovers() {
    let binary = fake_binary();
    let launcher = MockLauncher::new(connecting_script().launches([Step::Timeout]));
    let config = test_config(&binary).with_max_retries(2);
    let mut engine =
        ModelingEngine::with_launcher(config, launcher.clone()).with_discovery(DiscoveryInputs::none());

    engine.load("localhost:51174", LoadOptions::default()).await.unwrap();

    assert_eq!(launcher.stats.launch_attempts(), 2);
    assert_eq!(launcher.stats.launches(), 1);
    engine.close().await;
    assert_eq!(launcher.stats.leaked(), 0);
}

#[tokio::test]
async fn test_persistent_timeouts_exhaust_retries() {
    let binary = fake_binary();
    let launcher = MockLauncher::new(connecting_script().handshakes([Step::Timeout; 10]));
    let config = test_config(&binary).with_max_retries(4);
    let mut engine =
        ModelingEngine::with_launcher(config, launcher.clone()).with_discovery(DiscoveryInputs::none());

    let err = engine.load("localhost:51174", LoadOptions::default()).await.unwrap_err();

    match err {
        EngineError::Connection { attempts, message } => {
            assert_eq!(attempts, 4);
            assert!(message.contains("timed out"), "{message}");
        }
        other => panic!("expected connection error, got {other:?}"),
    }
    assert_eq!(engine.state(), LifecycleState::Failed);
    assert_eq!(launcher.stats.launches(), 4);
    assert_eq!(launcher.stats.teardowns(), 4);
    assert_eq!(launcher.stats.leaked(), 0);
}

#[tokio::test]
async fn test_zero_retries_still_attempts_once() {
    let binary = fake_binary();
    let launcher = MockLauncher::new(connecting_script().handshakes([Step::Timeout]));
    let config = test_config(&binary).with_max_retries(0);
    let mut engine =
        ModelingEngine::with_launcher(config, launcher.clone()).with_discovery(DiscoveryInputs::none());

    let err = engine.load("localhost:51174", LoadOptions::default()).await.unwrap_err();

    assert!(matches!(err, EngineError::Connection { attempts: 1, .. }));
    assert_eq!(launcher.stats.launch_attempts(), 1);
}

#[tokio::test]
async fn test_handshake_failure_is_not_retried() {
    let binary = fake_binary();
    let launcher = MockLauncher::new(connecting_script().handshakes([Step::Fail]));
    let config = test_config(&binary).with_max_retries(5);
    let mut engine =
        ModelingEngine::with_launcher(config, launcher.clone()).with_discovery(DiscoveryInputs::none());

    let err = engine.load("localhost:51174", LoadOptions::default()).await.unwrap_err();

    assert!(matches!(err, EngineError::Connection { attempts: 1, .. }));
    assert_eq!(launcher.stats.launches(), 1);
    assert_eq!(launcher.stats.teardowns(), 1);
    assert_eq!(launcher.stats.leaked(), 0);
}

#[tokio::test]
async fn test_spawn_failure_is_not_retried() {
    let binary = fake_binary();
    let launcher = MockLauncher::new(connecting_script().launches([Step::Fail]));
    let config = test_config(&binary).with_max_retries(5);
    let mut engine =
        ModelingEngine::with_launcher(config, launcher.clone()).with_discovery(DiscoveryInputs::none());

    let err = engine.load("localhost:51174", LoadOptions::default()).await.unwrap_err();

    match err {
        EngineError::Connection { attempts, message } => {
            assert_eq!(attempts, 1);
            assert!(message.contains("no such file"), "{message}");
        }
        other => panic!("expected connection error, got {other:?}"),
    }
    assert_eq!(launcher.stats.launch_attempts(), 1);
}

#[tokio::test]
async fn test_missing_binary_fails_before_launch() {
    let launcher = MockLauncher::new(connecting_script());
    let config = modelwiki::EngineConfig::default().with_server_path("/nonexistent/backend.exe");
    let mut engine =
        ModelingEngine::with_launcher(config, launcher.clone()).with_discovery(DiscoveryInputs::none());

    let err = engine.load("localhost:51174", LoadOptions::default()).await.unwrap_err();

    assert_eq!(err.kind(), "discovery");
    assert_eq!(engine.state(), LifecycleState::Failed);
    assert_eq!(launcher.stats.launch_attempts(), 0);
}
