//! Protocol error taxonomy.

use serde_json::Value;
use thiserror::Error;

use crate::jsonrpc::RpcErrorObject;

/// Closed set of protocol error kinds, each with a stable JSON-RPC code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    TaskNotFound,
    TaskNotCancelable,
    PushNotificationNotSupported,
    UnsupportedOperation,
}

impl ErrorKind {
    pub fn code(self) -> i64 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
            Self::TaskNotFound => -32001,
            Self::TaskNotCancelable => -32002,
            Self::PushNotificationNotSupported => -32003,
            Self::UnsupportedOperation => -32004,
        }
    }

    /// Map a wire code back to its kind. Unknown codes are internal errors.
    pub fn from_code(code: i64) -> Self {
        match code {
            -32700 => Self::ParseError,
            -32600 => Self::InvalidRequest,
            -32601 => Self::MethodNotFound,
            -32602 => Self::InvalidParams,
            -32001 => Self::TaskNotFound,
            -32002 => Self::TaskNotCancelable,
            -32003 => Self::PushNotificationNotSupported,
            -32004 => Self::UnsupportedOperation,
            _ => Self::InternalError,
        }
    }
}

/// Error surfaced to protocol callers.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} (code {})", .kind.code())]
pub struct ProtocolError {
    pub kind: ErrorKind,
    pub message: String,
    pub data: Option<Value>,
    pub task_id: Option<String>,
}

/// Result type for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

impl ProtocolError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            data: None,
            task_id: None,
        }
    }

    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ParseError, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRequest, message)
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            ErrorKind::MethodNotFound,
            format!("Method not found: {method}"),
        )
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidParams, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InternalError, message)
    }

    pub fn task_not_found(task_id: &str) -> Self {
        Self::new(ErrorKind::TaskNotFound, format!("Task not found: {task_id}"))
            .with_task_id(task_id)
    }

    pub fn task_not_cancelable(task_id: &str) -> Self {
        Self::new(
            ErrorKind::TaskNotCancelable,
            format!("Task not cancelable: {task_id}"),
        )
        .with_task_id(task_id)
    }

    pub fn push_notification_not_supported() -> Self {
        Self::new(
            ErrorKind::PushNotificationNotSupported,
            "Push Notification is not supported",
        )
    }

    pub fn unsupported_operation(operation: &str) -> Self {
        Self::new(
            ErrorKind::UnsupportedOperation,
            format!("Unsupported operation: {operation}"),
        )
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn code(&self) -> i64 {
        self.kind.code()
    }

    pub fn to_rpc_error(&self) -> RpcErrorObject {
        RpcErrorObject {
            code: self.code(),
            message: self.message.clone(),
            data: self.data.clone(),
        }
    }

    pub fn from_rpc_error(error: RpcErrorObject) -> Self {
        Self {
            kind: ErrorKind::from_code(error.code),
            message: error.message,
            data: error.data,
            task_id: None,
        }
    }

    /// Turn an arbitrary error into a protocol error.
    ///
    /// A `ProtocolError` is kept as-is; anything else becomes an internal
    /// error carrying its display message.
    pub fn normalize(error: &(dyn std::error::Error + 'static)) -> Self {
        match error.downcast_ref::<ProtocolError>() {
            Some(protocol) => protocol.clone(),
            None => Self::internal_error(error.to_string()),
        }
    }
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal_error(format!("JSON error: {err}"))
    }
}
