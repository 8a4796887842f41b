//! Stdio transport: a backend child process spoken to over NDJSON.

use std::collections::HashMap;
use std::io;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;

use super::error::{TransportError, TransportResult};
use super::protocol::{
    methods, CallToolParams, IncomingMessage, InitializeParams, InitializeResult,
    ListToolsParams, ListToolsResult, NotificationEnvelope, RequestEnvelope, ServerInfo,
};
use super::{BackendCommand, Launcher, Transport};

/// How long teardown waits for the backend to exit on its own after stdin
/// is closed, before killing it.
const EXIT_GRACE: Duration = Duration::from_millis(500);

/// Upper bound on `tools/list` pages followed in one discovery.
const MAX_TOOL_PAGES: usize = 64;

type PendingMap = Arc<Mutex<HashMap<String, oneshot::Sender<IncomingMessage>>>>;

/// Launches backends as child processes with piped standard streams.
#[derive(Debug, Clone, Default)]
pub struct StdioLauncher {
    /// Extra environment variables for the child.
    env: Vec<(String, String)>,
}

impl StdioLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an environment variable passed to every launched backend.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

#[async_trait]
impl Launcher for StdioLauncher {
    async fn launch(&self, command: &BackendCommand) -> TransportResult<Box<dyn Transport>> {
        let transport = StdioTransport::spawn(command, &self.env)?;
        Ok(Box::new(transport))
    }
}

/// Async JSON-RPC client for a backend child process.
///
/// Requests are written to the child's stdin one per line; a background
/// reader task routes responses from stdout to the waiting caller by id,
/// so concurrent requests on one transport are fine.
pub struct StdioTransport {
    /// Program name, kept for diagnostics.
    program: String,

    /// Writer for the backend's stdin. `None` once torn down.
    stdin: Arc<Mutex<Option<BufWriter<ChildStdin>>>>,

    /// Map of pending request IDs to response channels.
    pending: PendingMap,

    /// Handle to the backend process. `None` once torn down.
    child: Option<Child>,

    /// Background task reading stdout.
    reader_task: Option<JoinHandle<()>>,

    /// Background task forwarding stderr to the log.
    stderr_task: Option<JoinHandle<()>>,

    /// Set once the handshake completed.
    server_info: Option<ServerInfo>,
}

impl StdioTransport {
    /// Spawn the backend process described by `command`.
    pub fn spawn(command: &BackendCommand, env: &[(String, String)]) -> TransportResult<Self> {
        let program = command.program.display().to_string();
        let spawn_failed = |source: io::Error| TransportError::SpawnFailed {
            program: program.clone(),
            source,
        };

        let mut child = Command::new(&command.program)
            .args(&command.args)
            .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(spawn_failed)?;

        let missing = |stream: &str| {
            spawn_failed(io::Error::new(
                io::ErrorKind::BrokenPipe,
                format!("{} not captured", stream),
            ))
        };
        let stdin = child.stdin.take().ok_or_else(|| missing("stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| missing("stdout"))?;
        let stderr = child.stderr.take();

        tracing::debug!(program = %program, pid = ?child.id(), "spawned backend process");

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let reader_task = Self::spawn_reader_task(stdout, pending.clone());
        let stderr_task = stderr.map(|stderr| Self::spawn_stderr_task(stderr, program.clone()));

        Ok(Self {
            program,
            stdin: Arc::new(Mutex::new(Some(BufWriter::new(stdin)))),
            pending,
            child: Some(child),
            reader_task: Some(reader_task),
            stderr_task,
            server_info: None,
        })
    }

    /// Spawn the background task that reads messages from the backend.
    fn spawn_reader_task(stdout: ChildStdout, pending: PendingMap) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut reader = BufReader::new(stdout);
            let mut line = String::new();

            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => break,
                    Ok(_) => {
                        let trimmed = line.trim();
                        if trimmed.is_empty() {
                            continue;
                        }
                        match serde_json::from_str::<IncomingMessage>(trimmed) {
                            Ok(msg) => match msg.response_key() {
                                Some(key) => {
                                    let waiter = pending.lock().await.remove(&key);
                                    match waiter {
                                        Some(tx) => {
                                            let _ = tx.send(msg);
                                        }
                                        None => {
                                            tracing::debug!(id = %key, "dropping response with no waiter")
                                        }
                                    }
                                }
                                None => tracing::debug!(
                                    method = msg.method.as_deref().unwrap_or("?"),
                                    "ignoring backend-initiated message"
                                ),
                            },
                            Err(e) => {
                                tracing::debug!(error = %e, line = %trimmed, "non-protocol line on backend stdout")
                            }
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "backend read error");
                        break;
                    }
                }
            }

            // Dropping the senders wakes every waiter with a closed channel.
            pending.lock().await.clear();
        })
    }

    /// Spawn the background task that forwards backend stderr to the log.
    fn spawn_stderr_task(stderr: ChildStderr, program: String) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                tracing::debug!(target: "modelwiki::backend", program = %program, "{}", line);
            }
        })
    }

    /// Send a request and wait for its raw result.
    async fn request_raw(
        &self,
        method: &str,
        params: Option<Value>,
        timeout: Duration,
    ) -> TransportResult<Value> {
        let id = uuid::Uuid::new_v4().to_string();
        let request = RequestEnvelope::new(id.clone(), method, params);
        let line = serde_json::to_string(&request).map_err(TransportError::SerializeFailed)? + "\n";

        // Register response channel
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id.clone(), tx);

        tracing::debug!(method, id = %id, "-> backend");

        let exchange = async {
            self.write_line(&line).await?;
            match rx.await {
                Ok(msg) => Ok(msg),
                Err(_) => Err(TransportError::ProcessExited),
            }
        };

        let response = match tokio::time::timeout(timeout, exchange).await {
            Ok(Ok(msg)) => msg,
            Ok(Err(e)) => {
                self.pending.lock().await.remove(&id);
                return Err(e);
            }
            Err(_) => {
                // Drop only this request's waiter; the transport stays usable.
                self.pending.lock().await.remove(&id);
                return Err(TransportError::timeout(static_method(method), timeout));
            }
        };

        if let Some(error) = response.error {
            return Err(TransportError::remote(error.code, error.message));
        }
        Ok(response.result.unwrap_or(Value::Null))
    }

    /// Send a request and deserialize its result.
    async fn request<P, R>(&self, method: &str, params: P, timeout: Duration) -> TransportResult<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let params = serde_json::to_value(params).map_err(TransportError::SerializeFailed)?;
        let result = self.request_raw(method, Some(params), timeout).await?;
        serde_json::from_value(result).map_err(TransportError::DeserializeFailed)
    }

    /// Send a notification (no response expected).
    async fn notify(&self, method: &'static str, params: Option<Value>, timeout: Duration) -> TransportResult<()> {
        let note = NotificationEnvelope::new(method, params);
        let line = serde_json::to_string(&note).map_err(TransportError::SerializeFailed)? + "\n";
        tokio::time::timeout(timeout, self.write_line(&line))
            .await
            .map_err(|_| TransportError::timeout(method, timeout))?
    }

    async fn write_line(&self, line: &str) -> TransportResult<()> {
        let mut guard = self.stdin.lock().await;
        let stdin = guard.as_mut().ok_or(TransportError::TornDown)?;
        let written = match stdin.write_all(line.as_bytes()).await {
            Ok(()) => stdin.flush().await,
            Err(e) => Err(e),
        };
        written.map_err(|e| match e.kind() {
            io::ErrorKind::BrokenPipe => TransportError::ProcessExited,
            _ => TransportError::WriteFailed(e),
        })
    }

    fn ensure_session(&self) -> TransportResult<()> {
        if self.child.is_none() {
            return Err(TransportError::TornDown);
        }
        if self.server_info.is_none() {
            return Err(TransportError::NotInitialized);
        }
        Ok(())
    }

    /// Program this transport launched.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Identity the backend announced, once the handshake completed.
    pub fn server_info(&self) -> Option<&ServerInfo> {
        self.server_info.as_ref()
    }
}

#[async_trait]
impl Transport for StdioTransport {
    async fn handshake(&mut self, timeout: Duration) -> TransportResult<ServerInfo> {
        if self.child.is_none() {
            return Err(TransportError::TornDown);
        }

        let result: InitializeResult = self
            .request(methods::INITIALIZE, InitializeParams::default(), timeout)
            .await?;
        self.notify(methods::INITIALIZED, None, timeout).await?;

        tracing::debug!(
            server = %result.server_info.name,
            version = %result.server_info.version,
            protocol = result.protocol_version.as_deref().unwrap_or("?"),
            "backend handshake complete"
        );
        self.server_info = Some(result.server_info.clone());
        Ok(result.server_info)
    }

    async fn invoke(&self, tool: &str, arguments: Value, timeout: Duration) -> TransportResult<Value> {
        self.ensure_session()?;
        let params = serde_json::to_value(CallToolParams {
            name: tool.to_string(),
            arguments,
        })
        .map_err(TransportError::SerializeFailed)?;
        self.request_raw(methods::TOOLS_CALL, Some(params), timeout).await
    }

    async fn list_tools(&self, timeout: Duration) -> TransportResult<Vec<String>> {
        self.ensure_session()?;

        let mut names = Vec::new();
        let mut cursor: Option<String> = None;
        for _ in 0..MAX_TOOL_PAGES {
            let page: ListToolsResult = self
                .request(methods::TOOLS_LIST, ListToolsParams { cursor: cursor.clone() }, timeout)
                .await?;
            names.extend(page.tools.into_iter().map(|t| t.name));
            match page.next_cursor {
                Some(next) if Some(&next) != cursor.as_ref() => cursor = Some(next),
                _ => break,
            }
        }
        Ok(names)
    }

    async fn teardown(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };

        // Closing stdin asks a well-behaved backend to exit.
        self.stdin.lock().await.take();
        match tokio::time::timeout(EXIT_GRACE, child.wait()).await {
            Ok(Ok(status)) => tracing::debug!(program = %self.program, %status, "backend exited"),
            _ => {
                if let Err(e) = child.start_kill() {
                    tracing::debug!(program = %self.program, error = %e, "backend already gone");
                }
                let _ = child.wait().await;
                tracing::debug!(program = %self.program, "backend killed");
            }
        }

        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
        if let Some(task) = self.stderr_task.take() {
            task.abort();
        }
        self.pending.lock().await.clear();
        self.server_info = None;
    }

    fn is_alive(&self) -> bool {
        self.child.is_some()
            && self
                .reader_task
                .as_ref()
                .map(|task| !task.is_finished())
                .unwrap_or(false)
    }
}

impl Drop for StdioTransport {
    fn drop(&mut self) {
        // The child itself is killed by `kill_on_drop`.
        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
        if let Some(task) = self.stderr_task.take() {
            task.abort();
        }
    }
}

fn static_method(method: &str) -> &'static str {
    match method {
        methods::INITIALIZE => methods::INITIALIZE,
        methods::TOOLS_LIST => methods::TOOLS_LIST,
        methods::TOOLS_CALL => methods::TOOLS_CALL,
        _ => "request",
    }
}
