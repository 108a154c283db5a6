//! Configuration types.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use parley_types::{AgentCapabilities, AgentCard, AgentProvider, AgentSkill};
use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

/// Default address the server binds to.
pub const DEFAULT_BIND: &str = "127.0.0.1:41241";

/// Default directory of the file store.
pub const DEFAULT_STORE_DIR: &str = ".a2a-tasks";

// ─────────────────────────────────────────────────────────────────────────────
// Root
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration. Every section is optional; accessors fall back to defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParleyConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<StoreSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<AgentSection>,
}

impl ParleyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    pub fn merge(&mut self, other: ParleyConfig) {
        if other.server.is_some() {
            self.server = other.server;
        }
        if other.store.is_some() {
            self.store = other.store;
        }
        if other.agent.is_some() {
            self.agent = other.agent;
        }
    }

    pub fn server(&self) -> ServerSection {
        self.server.clone().unwrap_or_default()
    }

    pub fn store(&self) -> StoreSection {
        self.store.clone().unwrap_or_default()
    }

    pub fn agent(&self) -> AgentSection {
        self.agent.clone().unwrap_or_default()
    }

    /// Check values that TOML parsing alone cannot.
    pub fn validate(&self) -> Result<()> {
        let server = self.server();
        server.bind_addr()?;
        if !server.base_path.is_empty() && !server.base_path.starts_with('/') {
            return Err(ConfigError::InvalidValue {
                field: "server.base_path".to_string(),
                reason: format!("'{}' must start with '/'", server.base_path),
            });
        }
        if server.handler_timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "server.handler_timeout_secs".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        let store = self.store();
        if store.kind == StoreKind::File && store.dir.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "store.dir".to_string(),
                reason: "required when store.kind = \"file\"".to_string(),
            });
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Server
// ─────────────────────────────────────────────────────────────────────────────

/// `[server]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Address to bind to.
    pub bind: String,
    /// Path the JSON-RPC endpoint is mounted at.
    pub base_path: String,
    /// Enable CORS.
    pub cors: bool,
    /// Allowed origins. Empty means any origin.
    pub cors_origins: Vec<String>,
    /// Fail a handler that takes longer than this between updates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handler_timeout_secs: Option<u64>,
    /// Enable request logging.
    pub request_logging: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            base_path: "/".to_string(),
            cors: true,
            cors_origins: Vec::new(),
            handler_timeout_secs: None,
            request_logging: true,
        }
    }
}

impl ServerSection {
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.bind.parse().map_err(|e| ConfigError::InvalidValue {
            field: "server.bind".to_string(),
            reason: format!("'{}': {e}", self.bind),
        })
    }

    pub fn handler_timeout(&self) -> Option<Duration> {
        self.handler_timeout_secs.map(Duration::from_secs)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Store
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Memory,
    File,
}

/// `[store]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    pub kind: StoreKind,
    /// Directory of the file store. Ignored for `memory`.
    pub dir: PathBuf,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            kind: StoreKind::Memory,
            dir: PathBuf::from(DEFAULT_STORE_DIR),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Agent card
// ─────────────────────────────────────────────────────────────────────────────

/// `[agent]` section, the source of the served agent card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSection {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub version: String,
    /// Public URL of the agent. Derived from the bind address when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    pub streaming: bool,
    pub state_transition_history: bool,
    pub default_input_modes: Vec<String>,
    pub default_output_modes: Vec<String>,
    pub skills: Vec<AgentSkill>,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            name: "Parley Agent".to_string(),
            description: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
            url: None,
            documentation_url: None,
            organization: None,
            streaming: true,
            state_transition_history: false,
            default_input_modes: vec!["text".to_string()],
            default_output_modes: vec!["text".to_string()],
            skills: Vec::new(),
        }
    }
}

impl AgentSection {
    /// Build the agent card, using `fallback_url` when no URL is configured.
    pub fn to_card(&self, fallback_url: &str) -> AgentCard {
        AgentCard {
            name: self.name.clone(),
            description: self.description.clone(),
            url: self.url.clone().unwrap_or_else(|| fallback_url.to_string()),
            provider: self.organization.clone().map(|organization| AgentProvider {
                organization,
                url: None,
            }),
            version: self.version.clone(),
            documentation_url: self.documentation_url.clone(),
            capabilities: AgentCapabilities {
                streaming: self.streaming,
                push_notifications: false,
                state_transition_history: self.state_transition_history,
            },
            authentication: None,
            default_input_modes: self.default_input_modes.clone(),
            default_output_modes: self.default_output_modes.clone(),
            skills: self.skills.clone(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
