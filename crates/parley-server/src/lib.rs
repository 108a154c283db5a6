//! JSON-RPC and SSE task server for Parley.
//!
//! The server accepts JSON-RPC 2.0 requests on one configurable path, drives
//! a [`TaskHandler`] for each task and persists every update through a
//! [`TaskStore`](parley_store::TaskStore).
//!
//! # Features
//!
//! - `tasks/send`, `tasks/get`, `tasks/cancel`
//! - `tasks/sendSubscribe` and `tasks/resubscribe` over SSE
//! - Agent card at `/.well-known/agent.json`
//! - Request logging
//!
//! # Example
//!
//! ```ignore
//! use parley_server::{Server, ServerConfig, TaskContext, UpdateStream};
//! use parley_types::{Message, TaskState, TaskUpdate};
//!
//! let handler = |ctx: TaskContext| -> UpdateStream {
//!     Box::pin(futures::stream::once(async move {
//!         Ok(TaskUpdate::status_with_message(
//!             TaskState::Completed,
//!             Message::agent(ctx.user_message.text()),
//!         ))
//!     }))
//! };
//!
//! let server = Server::new(handler, ServerConfig::new());
//! server.run().await?;
//! ```

pub mod config;
pub mod error;
pub mod handler;
pub mod middleware;
pub mod routes;
pub mod sse;
pub mod state;
pub mod tasks;

pub use config::ServerConfig;
pub use error::{Result, ServerError};
pub use handler::{HandlerError, TaskContext, TaskHandler, UpdateStream};
pub use middleware::request_logging_middleware;
pub use state::AppState;
pub use tasks::{CANCEL_MESSAGE, EventStream, TaskManager};

use std::net::SocketAddr;

use axum::{
    Router,
    http::{HeaderValue, Method},
    routing::post,
};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// The Parley task server.
pub struct Server {
    /// Application state.
    state: AppState,
}

impl Server {
    /// Create a new server with the given handler and an in-memory store.
    pub fn new(handler: impl TaskHandler, config: ServerConfig) -> Self {
        Self {
            state: AppState::new(handler, config),
        }
    }

    /// Create a server from a pre-built application state.
    pub fn from_state(state: AppState) -> Self {
        Self { state }
    }

    /// Build the router with all routes and middleware.
    pub fn router(&self) -> Router {
        let base_path = self.state.config.base_path.as_str();

        let mut router = Router::new()
            .merge(routes::health_routes())
            .merge(routes::agent_card_routes())
            .route(base_path, post(routes::rpc_handler));
        if base_path != "/" {
            router = router.route(base_path.trim_end_matches('/'), post(routes::rpc_handler));
        }

        let mut router = router
            .layer(axum::middleware::from_fn_with_state(
                self.state.clone(),
                middleware::request_logging_middleware,
            ))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone());

        if let Some(cors) = self.cors_layer() {
            router = router.layer(cors);
        }
        router
    }

    fn cors_layer(&self) -> Option<CorsLayer> {
        let config = &self.state.config;
        if !config.cors {
            return None;
        }
        if config.cors_origins.is_empty() {
            return Some(CorsLayer::permissive());
        }

        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();

        Some(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers(Any),
        )
    }

    /// Run the server.
    pub async fn run(self) -> Result<()> {
        let addr = self.state.config.bind_address;
        self.run_on(addr).await
    }

    /// Run the server on a specific address (useful for testing).
    pub async fn run_on(self, addr: SocketAddr) -> Result<()> {
        let router = self.router();

        info!(
            addr = %addr,
            base_path = %self.state.config.base_path,
            "Starting task server"
        );

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Internal(format!("Failed to bind: {}", e)))?;

        axum::serve(listener, router)
            .await
            .map_err(|e| ServerError::Internal(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Get the configured bind address.
    pub fn bind_address(&self) -> SocketAddr {
        self.state.config.bind_address
    }

    /// Shared application state.
    pub fn state(&self) -> &AppState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use parley_types::{Message, TaskState, TaskUpdate};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn echo() -> impl TaskHandler {
        |ctx: TaskContext| -> UpdateStream {
            let reply = Message::agent(format!("echo: {}", ctx.user_message.text()));
            Box::pin(futures::stream::iter(vec![
                Ok(TaskUpdate::status(TaskState::Working)),
                Ok(TaskUpdate::status_with_message(TaskState::Completed, reply)),
            ]))
        }
    }

    fn test_server(config: ServerConfig) -> Server {
        Server::new(echo(), config.with_request_logging(false))
    }

    async fn post_raw(app: Router, uri: &str, body: impl Into<Body>) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(body.into())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    async fn rpc(app: Router, body: Value) -> Value {
        let (status, value) = post_raw(app, "/", body.to_string()).await;
        assert_eq!(status, StatusCode::OK);
        value
    }

    #[tokio::test]
    async fn test_server_health_endpoint() {
        let app = test_server(ServerConfig::new()).router();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_agent_card_endpoint() {
        let app = test_server(ServerConfig::new()).router();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/.well-known/agent.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let card: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(card["name"], "Parley Agent");
        assert_eq!(card["capabilities"]["streaming"], true);
        assert_eq!(card["defaultInputModes"], json!(["text"]));
    }

    #[tokio::test]
    async fn test_send_and_get() {
        let server = test_server(ServerConfig::new());

        let sent = rpc(
            server.router(),
            json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "tasks/send",
                "params": {"id": "t1", "message": {"role": "user", "parts": [{"text": "hi"}]}}
            }),
        )
        .await;
        assert_eq!(sent["id"], 1);
        assert_eq!(sent["result"]["status"]["state"], "completed");
        assert_eq!(sent["result"]["status"]["message"]["parts"][0]["text"], "echo: hi");
        assert!(sent["result"].get("history").is_none());

        let got = rpc(
            server.router(),
            json!({"jsonrpc": "2.0", "id": "g", "method": "tasks/get", "params": {"id": "t1"}}),
        )
        .await;
        assert_eq!(got["id"], "g");
        assert_eq!(got["result"], sent["result"]);
    }

    #[tokio::test]
    async fn test_not_json_is_parse_error() {
        let app = test_server(ServerConfig::new()).router();
        let (status, body) = post_raw(app, "/", "{not json").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], -32700);
        assert!(body["id"].is_null());
    }

    #[tokio::test]
    async fn test_invalid_structure() {
        let app = test_server(ServerConfig::new()).router();
        let body = rpc(app, json!({"jsonrpc": "1.0", "id": 3, "method": "tasks/get"})).await;

        assert_eq!(body["error"]["code"], -32600);
        assert_eq!(body["error"]["message"], "Invalid JSON-RPC request structure.");
        assert_eq!(body["id"], 3);
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let app = test_server(ServerConfig::new()).router();
        let body = rpc(app, json!({"jsonrpc": "2.0", "id": 1, "method": "tasks/frobnicate"})).await;

        assert_eq!(body["error"]["code"], -32601);
        assert_eq!(body["error"]["message"], "Method not found: tasks/frobnicate");
    }

    #[tokio::test]
    async fn test_push_notifications_unsupported() {
        let server = test_server(ServerConfig::new());
        for method in ["tasks/pushNotification/set", "tasks/pushNotification/get"] {
            let body = rpc(
                server.router(),
                json!({"jsonrpc": "2.0", "id": 1, "method": method, "params": {"id": "t1"}}),
            )
            .await;
            assert_eq!(body["error"]["code"], -32003, "{method}");
        }
    }

    #[tokio::test]
    async fn test_send_param_validation() {
        let server = test_server(ServerConfig::new());
        let cases = [
            (json!(null), "Missing or invalid params object."),
            (json!({"message": {"parts": []}}), "Invalid or missing task ID (params.id)."),
            (
                json!({"id": "", "message": {"parts": []}}),
                "Invalid or missing task ID (params.id).",
            ),
            (json!({"id": "t1"}), "Invalid or missing message object (params.message)."),
            (
                json!({"id": "t1", "message": {"parts": "nope"}}),
                "Invalid or missing message object (params.message).",
            ),
        ];

        for (params, message) in cases {
            let body = rpc(
                server.router(),
                json!({"jsonrpc": "2.0", "id": 1, "method": "tasks/send", "params": params}),
            )
            .await;
            assert_eq!(body["error"]["code"], -32602);
            assert_eq!(body["error"]["message"], message);
        }
    }

    #[tokio::test]
    async fn test_get_requires_id() {
        let app = test_server(ServerConfig::new()).router();
        let body = rpc(app, json!({"jsonrpc": "2.0", "id": 1, "method": "tasks/get", "params": {}})).await;

        assert_eq!(body["error"]["code"], -32602);
        assert_eq!(body["error"]["message"], "Missing task ID.");
    }

    #[tokio::test]
    async fn test_get_unknown_task() {
        let app = test_server(ServerConfig::new()).router();
        let body = rpc(
            app,
            json!({"jsonrpc": "2.0", "id": 1, "method": "tasks/get", "params": {"id": "nope"}}),
        )
        .await;

        assert_eq!(body["error"]["code"], -32001);
    }

    #[tokio::test]
    async fn test_base_path_with_and_without_slash() {
        let server = test_server(ServerConfig::new().with_base_path("/a2a"));
        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "tasks/send",
            "params": {"id": "t1", "message": {"role": "user", "parts": [{"text": "x"}]}}
        });

        for uri in ["/a2a/", "/a2a"] {
            let (status, body) = post_raw(server.router(), uri, request.to_string()).await;
            assert_eq!(status, StatusCode::OK, "{uri}");
            assert_eq!(body["result"]["id"], "t1");
        }

        let response = server
            .router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .body(Body::from(request.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_ne!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_bind_address() {
        let server = test_server(
            ServerConfig::new().with_bind_address("127.0.0.1:9999".parse().unwrap()),
        );
        assert_eq!(server.bind_address().port(), 9999);
    }
}
