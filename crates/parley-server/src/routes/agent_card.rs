//! Capability discovery.

use axum::{Json, Router, extract::State, routing::get};
use parley_types::{AGENT_CARD_PATH, AgentCard};

use crate::state::AppState;

/// `GET /.well-known/agent.json`.
pub async fn agent_card_handler(State(state): State<AppState>) -> Json<AgentCard> {
    Json(state.card.as_ref().clone())
}

pub fn agent_card_routes() -> Router<AppState> {
    Router::new().route(AGENT_CARD_PATH, get(agent_card_handler))
}
