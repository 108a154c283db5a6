//! Main client implementation.

use std::sync::Arc;
use std::time::Duration;

use parley_types::{
    AGENT_CARD_PATH, AgentCard, Capability, JsonRpcRequest, JsonRpcResponse, ProtocolError, Task,
    TaskIdParams, TaskPushNotificationConfig, TaskQueryParams, TaskSendParams, methods,
};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::OnceCell;
use tracing::debug;
use url::Url;

use crate::error::{Result, network_error, status_error};
use crate::stream::{TaskEventStream, decode_events};

/// Default timeout for requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default limit on silence while a stream is open, headers included.
const DEFAULT_STREAM_TIMEOUT: Duration = Duration::from_secs(300);

const EVENT_STREAM: &str = "text/event-stream";

/// Client for a task server.
///
/// Cheap to clone; clones share the connection pool and the cached agent card.
#[derive(Clone)]
pub struct A2aClient {
    /// Inner shared state.
    inner: Arc<ClientInner>,
}

/// Inner client state (shared across clones).
struct ClientInner {
    http: reqwest::Client,
    /// JSON-RPC endpoint.
    endpoint: Url,
    timeout: Duration,
    stream_timeout: Duration,
    /// Filled on the first successful fetch.
    card: OnceCell<AgentCard>,
}

impl A2aClient {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// The JSON-RPC endpoint calls are posted to.
    pub fn endpoint(&self) -> &Url {
        &self.inner.endpoint
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Task methods
    // ─────────────────────────────────────────────────────────────────────────

    /// `tasks/send`: run a task to the end and return it.
    pub async fn send_task(&self, params: TaskSendParams) -> Result<Task> {
        self.call(methods::SEND, &params).await
    }

    /// `tasks/sendSubscribe`: start a task and stream its events.
    pub async fn send_task_subscribe(&self, params: TaskSendParams) -> Result<TaskEventStream> {
        self.call_stream(methods::SEND_SUBSCRIBE, &params).await
    }

    /// `tasks/get`.
    pub async fn get_task(&self, params: TaskQueryParams) -> Result<Task> {
        self.call(methods::GET, &params).await
    }

    /// `tasks/cancel`.
    pub async fn cancel_task(&self, params: TaskIdParams) -> Result<Task> {
        self.call(methods::CANCEL, &params).await
    }

    /// `tasks/pushNotification/set`.
    pub async fn set_task_push_notification(
        &self,
        params: TaskPushNotificationConfig,
    ) -> Result<TaskPushNotificationConfig> {
        self.call(methods::SET_PUSH_NOTIFICATION, &params).await
    }

    /// `tasks/pushNotification/get`.
    pub async fn get_task_push_notification(
        &self,
        params: TaskIdParams,
    ) -> Result<TaskPushNotificationConfig> {
        self.call(methods::GET_PUSH_NOTIFICATION, &params).await
    }

    /// `tasks/resubscribe`: the current status of a task, then its live events.
    pub async fn resubscribe_task(&self, params: TaskQueryParams) -> Result<TaskEventStream> {
        self.call_stream(methods::RESUBSCRIBE, &params).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Capability discovery
    // ─────────────────────────────────────────────────────────────────────────

    /// The server's agent card, fetched once and cached.
    ///
    /// A failed fetch is not cached; the next call tries again.
    pub async fn agent_card(&self) -> Result<AgentCard> {
        let card = self
            .inner
            .card
            .get_or_try_init(|| self.fetch_agent_card())
            .await?;
        Ok(card.clone())
    }

    /// Whether the server advertises `capability`. `false` when the card
    /// cannot be fetched.
    pub async fn supports(&self, capability: Capability) -> bool {
        match self.agent_card().await {
            Ok(card) => card.supports(capability),
            Err(e) => {
                debug!(error = %e, "Agent card unavailable");
                false
            }
        }
    }

    async fn fetch_agent_card(&self) -> Result<AgentCard> {
        let url = self
            .inner
            .endpoint
            .join(AGENT_CARD_PATH)
            .map_err(|e| ProtocolError::internal_error(format!("Invalid URL: {e}")))?;

        let response = self
            .inner
            .http
            .get(url)
            .timeout(self.inner.timeout)
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        let body = response.text().await.map_err(network_error)?;
        if !status.is_success() {
            return Err(ProtocolError::internal_error(format!(
                "Failed to fetch agent card: HTTP {status}"
            )));
        }
        serde_json::from_str(&body)
            .map_err(|e| ProtocolError::internal_error(format!("Invalid agent card: {e}")))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // JSON-RPC transport
    // ─────────────────────────────────────────────────────────────────────────

    fn request<P: Serialize>(&self, method: &str, params: &P) -> Result<JsonRpcRequest> {
        let params = serde_json::to_value(params)?;
        Ok(JsonRpcRequest::new(
            uuid::Uuid::new_v4().to_string(),
            method,
            params,
        ))
    }

    /// Post a call and return the `result` of the response envelope.
    async fn call<P, T>(&self, method: &str, params: &P) -> Result<T>
    where
        P: Serialize,
        T: DeserializeOwned,
    {
        let request = self.request(method, params)?;
        debug!(method, "Sending request");

        let response = self
            .inner
            .http
            .post(self.inner.endpoint.clone())
            .header(ACCEPT, "application/json")
            .json(&request)
            .timeout(self.inner.timeout)
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        let body = response.text().await.map_err(network_error)?;
        if !status.is_success() {
            return Err(status_error(status, &body));
        }
        parse_result(&body)
    }

    /// Post a streaming call.
    ///
    /// A server that answers with a plain JSON envelope instead of a stream
    /// rejected the call; its error is returned here.
    async fn call_stream<P: Serialize>(&self, method: &str, params: &P) -> Result<TaskEventStream> {
        let request = self.request(method, params)?;
        debug!(method, "Opening stream");

        // A total timeout would cut long streams, so only the wait for
        // headers and the gaps between chunks are limited.
        let idle = self.inner.stream_timeout;
        let pending = self
            .inner
            .http
            .post(self.inner.endpoint.clone())
            .header(ACCEPT, EVENT_STREAM)
            .json(&request)
            .send();
        let response = tokio::time::timeout(idle, pending)
            .await
            .map_err(|_| {
                ProtocolError::internal_error(format!("Network error: no response for {idle:?}"))
            })?
            .map_err(network_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.map_err(network_error)?;
            return Err(status_error(status, &body));
        }

        let is_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with(EVENT_STREAM));
        if is_stream {
            return Ok(decode_events(response, idle));
        }

        let body = response.text().await.map_err(network_error)?;
        match parse_result::<serde_json::Value>(&body) {
            Err(err) => Err(err),
            Ok(_) => Err(ProtocolError::internal_error(
                "Expected an event stream, got a JSON response",
            )),
        }
    }
}

/// Parse a response envelope and extract its `result`.
fn parse_result<T: DeserializeOwned>(body: &str) -> Result<T> {
    let envelope: JsonRpcResponse = serde_json::from_str(body)
        .map_err(|e| ProtocolError::internal_error(format!("Invalid JSON-RPC response: {e}")))?;
    let result = envelope.into_result()?;
    Ok(serde_json::from_value(result)?)
}

/// Builder for creating an [`A2aClient`].
#[derive(Debug)]
pub struct ClientBuilder {
    base_url: Option<String>,
    auth_token: Option<String>,
    timeout: Duration,
    stream_timeout: Duration,
    user_agent: Option<String>,
}

impl ClientBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            base_url: None,
            auth_token: None,
            timeout: DEFAULT_TIMEOUT,
            stream_timeout: DEFAULT_STREAM_TIMEOUT,
            user_agent: None,
        }
    }

    /// Set the JSON-RPC endpoint URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set how long an open stream may stay silent before it fails.
    ///
    /// Server keep-alives count as traffic, so a stream may last longer
    /// than this overall.
    pub fn stream_timeout(mut self, timeout: Duration) -> Self {
        self.stream_timeout = timeout;
        self
    }

    /// Set a custom user agent.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<A2aClient> {
        let base_url = self
            .base_url
            .ok_or_else(|| ProtocolError::invalid_params("base_url is required"))?;

        let mut endpoint = Url::parse(&base_url)
            .map_err(|e| ProtocolError::invalid_params(format!("Invalid URL: {e}")))?;
        if !endpoint.path().ends_with('/') {
            endpoint.set_path(&format!("{}/", endpoint.path()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = &self.auth_token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| ProtocolError::invalid_params("Invalid auth token"))?;
            headers.insert(AUTHORIZATION, value);
        }

        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("parley-client/{}", env!("CARGO_PKG_VERSION")));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(user_agent)
            .build()
            .map_err(network_error)?;

        Ok(A2aClient {
            inner: Arc::new(ClientInner {
                http,
                endpoint,
                timeout: self.timeout,
                stream_timeout: self.stream_timeout,
                card: OnceCell::new(),
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
