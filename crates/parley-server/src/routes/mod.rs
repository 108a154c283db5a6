//! HTTP routes.

pub mod agent_card;
pub mod health;
pub mod rpc;

pub use agent_card::{agent_card_handler, agent_card_routes};
pub use health::{HealthResponse, health_routes};
pub use rpc::rpc_handler;
