//! Application state shared across handlers.

use std::sync::Arc;

use parley_store::{InMemoryTaskStore, TaskStore};
use parley_types::AgentCard;

use crate::config::ServerConfig;
use crate::handler::TaskHandler;
use crate::tasks::TaskManager;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Task lifecycle manager.
    pub tasks: Arc<TaskManager>,

    /// Agent card served at the well-known path.
    pub card: Arc<AgentCard>,

    /// Server configuration.
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Create state backed by an in-memory store.
    pub fn new(handler: impl TaskHandler, config: ServerConfig) -> Self {
        Self::with_store(handler, Arc::new(InMemoryTaskStore::new()), config)
    }

    /// Create state backed by the given store.
    pub fn with_store(
        handler: impl TaskHandler,
        store: Arc<dyn TaskStore>,
        config: ServerConfig,
    ) -> Self {
        let tasks =
            TaskManager::new(Arc::new(handler), store).with_handler_timeout(config.handler_timeout);
        let card = AgentCard::new(
            "Parley Agent",
            config.public_url(),
            env!("CARGO_PKG_VERSION"),
        );
        Self {
            tasks: Arc::new(tasks),
            card: Arc::new(card),
            config: Arc::new(config),
        }
    }

    /// Replace the served agent card.
    pub fn with_agent_card(mut self, card: AgentCard) -> Self {
        self.card = Arc::new(card);
        self
    }
}
