//! Error types for the server.

use thiserror::Error;

/// Server error type.
///
/// Protocol failures never surface here; they are answered on the wire as
/// JSON-RPC errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] parley_config::ConfigError),
}

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;
