//! Server configuration.

use std::net::SocketAddr;
use std::time::Duration;

use parley_config::ParleyConfig;

use crate::Result;

/// Default port of the task server.
pub const DEFAULT_PORT: u16 = 41241;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to.
    pub bind_address: SocketAddr,

    /// Path of the JSON-RPC endpoint, normalized to `/` or `/segment/`.
    pub base_path: String,

    /// Enable CORS.
    pub cors: bool,

    /// CORS allowed origins (empty = any origin).
    pub cors_origins: Vec<String>,

    /// Fail a run whose handler takes longer than this to yield its next update.
    pub handler_timeout: Option<Duration>,

    /// Enable request logging.
    pub request_logging: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            base_path: "/".to_string(),
            cors: true,
            cors_origins: Vec::new(),
            handler_timeout: None,
            request_logging: true,
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the `[server]` section of a loaded configuration.
    pub fn from_config(config: &ParleyConfig) -> Result<Self> {
        config.validate()?;
        let server = config.server();
        Ok(Self {
            bind_address: server.bind_addr()?,
            base_path: normalize_base_path(&server.base_path),
            cors: server.cors,
            cors_origins: server.cors_origins.clone(),
            handler_timeout: server.handler_timeout(),
            request_logging: server.request_logging,
        })
    }

    /// Set the bind address.
    pub fn with_bind_address(mut self, addr: SocketAddr) -> Self {
        self.bind_address = addr;
        self
    }

    /// Set the JSON-RPC endpoint path.
    pub fn with_base_path(mut self, path: &str) -> Self {
        self.base_path = normalize_base_path(path);
        self
    }

    /// Enable or disable CORS.
    pub fn with_cors(mut self, enabled: bool) -> Self {
        self.cors = enabled;
        self
    }

    /// Set CORS allowed origins.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = origins;
        self
    }

    pub fn with_handler_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.handler_timeout = timeout;
        self
    }

    /// Enable or disable request logging.
    pub fn with_request_logging(mut self, enabled: bool) -> Self {
        self.request_logging = enabled;
        self
    }

    /// URL the agent is reachable at, used when no card URL is configured.
    pub fn public_url(&self) -> String {
        format!("http://{}{}", self.bind_address, self.base_path)
    }
}

/// `""`, `"/"` → `"/"`; `"a2a"`, `"/a2a"`, `"/a2a/"` → `"/a2a/"`.
pub fn normalize_base_path(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{trimmed}/")
    }
}
