//! Liveness probe.

use axum::{Json, Router, extract::State, routing::get};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// Body of `GET /health`.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// Server crate version.
    pub version: String,
    /// Name from the served agent card.
    pub agent: String,
}

pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        agent: state.card.name.clone(),
    })
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_handler))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::handler::{TaskContext, UpdateStream};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use parley_types::AgentCard;
    use tower::ServiceExt;

    fn idle(_ctx: TaskContext) -> UpdateStream {
        Box::pin(futures::stream::empty())
    }

    #[tokio::test]
    async fn test_health_reports_agent() {
        let state = AppState::new(idle, ServerConfig::new())
            .with_agent_card(AgentCard::new("Probe", "http://localhost/", "1.0.0"));
        let app = health_routes().with_state(state);

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let health: HealthResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(health.status, "ok");
        assert_eq!(health.agent, "Probe");
        assert!(!health.version.is_empty());
    }
}
