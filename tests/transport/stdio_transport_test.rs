// tests/transport/stdio_transport_test.rs
//
// Exercises the stdio transport against ordinary system binaries that never
// speak the protocol.
#![cfg(unix)]

use std::time::{Duration, Instant};

use modelwiki::transport::{BackendCommand, Launcher, StdioLauncher, TransportError};
use serde_json::json;

#[tokio::test]
async fn test_silent_backend_times_out_handshake() {
    let command = BackendCommand::new("sleep").with_args(["30"]);
    let mut transport = StdioLauncher::new().launch(&command).await.unwrap();

    let started = Instant::now();
    let err = transport.handshake(Duration::from_millis(200)).await.unwrap_err();

    assert!(err.is_timeout(), "{err}");
    assert!(err.is_retriable());
    assert!(started.elapsed() < Duration::from_secs(10));

    transport.teardown().await;
    assert!(!transport.is_alive());
}

#[tokio::test]
async fn test_exited_backend_fails_handshake_without_timeout() {
    let command = BackendCommand::new("true");
    let mut transport = StdioLauncher::new().launch(&command).await.unwrap();

    let err = transport.handshake(Duration::from_secs(5)).await.unwrap_err();

    assert!(!err.is_timeout(), "{err}");
    assert!(!err.is_retriable());
    transport.teardown().await;
}

#[tokio::test]
async fn test_missing_program_fails_to_launch() {
    let command = BackendCommand::new("/nonexistent/modelwiki-backend");
    let err = StdioLauncher::new().launch(&command).await.err().unwrap();

    assert!(matches!(err, TransportError::SpawnFailed { .. }));
    assert!(!err.is_retriable());
}

#[tokio::test]
async fn test_invoke_requires_handshake() {
    let command = BackendCommand::new("sleep").with_args(["30"]);
    let mut transport = StdioLauncher::new().launch(&command).await.unwrap();

    let err = transport
        .invoke("get_tables", json!({}), Duration::from_secs(1))
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::NotInitialized));

    transport.teardown().await;
}

#[tokio::test]
async fn test_teardown_is_idempotent() {
    let command = BackendCommand::new("sleep").with_args(["30"]);
    let mut transport = StdioLauncher::new().launch(&command).await.unwrap();
    assert!(transport.is_alive());

    transport.teardown().await;
    transport.teardown().await;

    assert!(!transport.is_alive());
    let err = transport
        .list_tools(Duration::from_secs(1))
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::TornDown));
}

#[tokio::test]
async fn test_launcher_env_reaches_backend() {
    // Stays up only when the variable is set; exits at once otherwise.
    let command = BackendCommand::new("sh").with_args(["-c", r#"[ "$MODELWIKI_TEST_FLAG" = 1 ] && exec sleep 30"#]);

    let launcher = StdioLauncher::new().with_env("MODELWIKI_TEST_FLAG", "1");
    let mut transport = launcher.launch(&command).await.unwrap();
    let err = transport.handshake(Duration::from_millis(300)).await.unwrap_err();
    assert!(err.is_timeout(), "{err}");
    assert!(transport.is_alive());
    transport.teardown().await;

    let mut transport = StdioLauncher::new().launch(&command).await.unwrap();
    let err = transport.handshake(Duration::from_secs(5)).await.unwrap_err();
    assert!(!err.is_timeout(), "{err}");
    transport.teardown().await;
}
