//! Mapping transport failures into protocol errors.

use parley_types::{JsonRpcResponse, ProtocolError};
use reqwest::StatusCode;

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// A failure below the protocol: connect, timeout, broken body.
pub(crate) fn network_error(err: reqwest::Error) -> ProtocolError {
    ProtocolError::internal_error(format!("Network error: {err}"))
}

/// Error for a non-2xx response. A JSON-RPC error in the body wins over the
/// HTTP status.
pub(crate) fn status_error(status: StatusCode, body: &str) -> ProtocolError {
    match serde_json::from_str::<JsonRpcResponse>(body) {
        Ok(JsonRpcResponse {
            error: Some(error), ..
        }) => ProtocolError::from_rpc_error(error),
        _ => ProtocolError::internal_error(format!("HTTP error: {status}")),
    }
}
