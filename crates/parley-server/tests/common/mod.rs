//! Common test utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use reqwest::Client;
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use parley_server::{
    AppState, HandlerError, Server, ServerConfig, TaskContext, TaskHandler, UpdateStream,
};
use parley_store::{InMemoryTaskStore, TaskStore};
use parley_types::{Artifact, Message, Part, TaskState, TaskUpdate};

/// A test server that runs in the background.
pub struct TestServer {
    /// The server's address.
    pub addr: SocketAddr,
    /// HTTP client configured for this server.
    pub client: Client,
    /// The store behind the server.
    pub store: Arc<dyn TaskStore>,
    /// Handle to the server task.
    _handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a new test server with default configuration.
    pub async fn start() -> Result<Self> {
        Self::start_with(ServerConfig::new(), Arc::new(InMemoryTaskStore::new())).await
    }

    /// Start a test server with the given config and store.
    pub async fn start_with(config: ServerConfig, store: Arc<dyn TaskStore>) -> Result<Self> {
        let addr = find_available_port().await?;

        let config = config
            .with_bind_address(addr)
            .with_request_logging(false);
        let state = AppState::with_store(scenario_handler(), store.clone(), config);

        let server = Server::from_state(state);
        let handle = tokio::spawn(async move {
            let _ = server.run_on(addr).await;
        });

        let client = Client::new();
        wait_for_server(&client, addr).await?;

        Ok(Self {
            addr,
            client,
            store,
            _handle: handle,
        })
    }

    /// Get the base URL for the server.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// POST a JSON-RPC call to `/` and return the parsed envelope.
    pub async fn rpc(&self, method: &str, params: Value) -> Result<Value> {
        let resp = self
            .client
            .post(format!("{}/", self.base_url()))
            .json(&json!({"jsonrpc": "2.0", "id": 1, "method": method, "params": params}))
            .send()
            .await?;
        anyhow::ensure!(resp.status().is_success(), "HTTP {}", resp.status());
        Ok(resp.json().await?)
    }

    /// POST a streaming JSON-RPC call and collect every event until the stream closes.
    pub async fn rpc_stream(&self, method: &str, params: Value) -> Result<Vec<Value>> {
        let resp = self
            .client
            .post(format!("{}/", self.base_url()))
            .header("Accept", "text/event-stream")
            .json(&json!({"jsonrpc": "2.0", "id": "s", "method": method, "params": params}))
            .send()
            .await?;

        let content_type = resp
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        anyhow::ensure!(
            content_type.starts_with("text/event-stream"),
            "expected an event stream, got {content_type}"
        );

        let body = timeout(Duration::from_secs(10), resp.text()).await??;
        Ok(parse_sse(&body))
    }

    /// `tasks/send` with a single text part.
    pub async fn send_text(&self, task_id: &str, text: &str) -> Result<Value> {
        self.rpc("tasks/send", send_params(task_id, text)).await
    }

    /// Poll `tasks/get` until the task reaches `state`.
    pub async fn wait_for_state(&self, task_id: &str, state: &str) -> Result<()> {
        let result = timeout(Duration::from_secs(5), async {
            loop {
                let got = self.rpc("tasks/get", json!({"id": task_id})).await?;
                if got["result"]["status"]["state"] == state {
                    return Ok::<_, anyhow::Error>(());
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await;

        match result {
            Ok(inner) => inner,
            Err(_) => anyhow::bail!("Timeout waiting for {task_id} to reach {state}"),
        }
    }
}

pub fn send_params(task_id: &str, text: &str) -> Value {
    json!({
        "id": task_id,
        "message": {"role": "user", "parts": [{"type": "text", "text": text}]}
    })
}

/// The `result` of every `data:` frame. Keep-alive comments are skipped.
pub fn parse_sse(body: &str) -> Vec<Value> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .filter_map(|data| serde_json::from_str::<Value>(data.trim()).ok())
        .map(|envelope| envelope["result"].clone())
        .collect()
}

fn ok(update: impl Into<TaskUpdate>) -> Result<TaskUpdate, HandlerError> {
    Ok(update.into())
}

/// A handler whose behavior is picked by the user's text.
///
/// - `hello`: working, then completed with "hi"
/// - `boom`: working, then fails with "boom"
/// - `stall`: two working updates, then ends without a final state
/// - `artifacts`: replaces one artifact, appends to another, then completes
/// - `ask`: input-required
/// - `slow`: working, then waits up to 30s or until cancelled
/// - `stubborn`: working, then completes after 300ms whether cancelled or not
/// - `sleepy`: yields nothing for 30s
/// - anything else: completed with an echo
pub fn scenario_handler() -> impl TaskHandler {
    |ctx: TaskContext| -> UpdateStream {
        let text = ctx.user_message.text();
        Box::pin(async_stream::stream! {
            match text.as_str() {
                "hello" => {
                    yield ok(TaskUpdate::status(TaskState::Working));
                    yield ok(TaskUpdate::status_with_message(
                        TaskState::Completed,
                        Message::agent("hi"),
                    ));
                }
                "boom" => {
                    yield ok(TaskUpdate::status(TaskState::Working));
                    yield Err("boom".into());
                }
                "stall" => {
                    yield ok(TaskUpdate::status(TaskState::Working));
                    yield ok(TaskUpdate::status(TaskState::Working));
                }
                "artifacts" => {
                    yield ok(Artifact::new(vec![Part::text("draft")]).with_name("doc").with_index(0));
                    yield ok(Artifact::new(vec![Part::text("final")]).with_name("doc").with_index(0));
                    yield ok(Artifact::new(vec![Part::text("a")]).with_name("log").with_index(1));
                    yield ok(Artifact::new(vec![Part::text("b")]).with_index(1).appending());
                    yield ok(TaskUpdate::status(TaskState::Completed));
                }
                "ask" => {
                    yield ok(TaskUpdate::status_with_message(
                        TaskState::InputRequired,
                        Message::agent("Which one?"),
                    ));
                }
                "slow" => {
                    yield ok(TaskUpdate::status(TaskState::Working));
                    tokio::select! {
                        _ = ctx.cancelled() => {}
                        _ = tokio::time::sleep(Duration::from_secs(30)) => {}
                    }
                    yield ok(TaskUpdate::status(TaskState::Completed));
                }
                "stubborn" => {
                    yield ok(TaskUpdate::status(TaskState::Working));
                    tokio::time::sleep(Duration::from_millis(300)).await;
                    yield ok(TaskUpdate::status_with_message(
                        TaskState::Completed,
                        Message::agent("finished anyway"),
                    ));
                }
                "sleepy" => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    yield ok(TaskUpdate::status(TaskState::Completed));
                }
                other => {
                    yield ok(TaskUpdate::status_with_message(
                        TaskState::Completed,
                        Message::agent(format!("echo: {other}")),
                    ));
                }
            }
        })
    }
}

/// Find an available port for the test server.
async fn find_available_port() -> Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(addr)
}

/// Wait for the server to become ready.
async fn wait_for_server(client: &Client, addr: SocketAddr) -> Result<()> {
    let url = format!("http://{}/health", addr);

    let result = timeout(Duration::from_secs(5), async {
        loop {
            match client.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => return,
                _ => tokio::time::sleep(Duration::from_millis(50)).await,
            }
        }
    })
    .await;

    match result {
        Ok(()) => Ok(()),
        Err(_) => anyhow::bail!("Timeout waiting for server to start"),
    }
}
