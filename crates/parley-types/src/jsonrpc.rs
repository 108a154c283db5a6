//! JSON-RPC 2.0 envelope.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::error::ProtocolError;

pub const JSONRPC_VERSION: &str = "2.0";

/// Method names understood by the task server.
pub mod methods {
    pub const SEND: &str = "tasks/send";
    pub const SEND_SUBSCRIBE: &str = "tasks/sendSubscribe";
    pub const GET: &str = "tasks/get";
    pub const CANCEL: &str = "tasks/cancel";
    pub const RESUBSCRIBE: &str = "tasks/resubscribe";
    pub const SET_PUSH_NOTIFICATION: &str = "tasks/pushNotification/set";
    pub const GET_PUSH_NOTIFICATION: &str = "tasks/pushNotification/get";
}

/// Request id: a number or a string. A missing or `null` id is `None` at the use site.
///
/// Numbers are kept as written, so unsigned and fractional ids echo back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcId {
    Number(Number),
    String(String),
}

impl From<String> for JsonRpcId {
    fn from(id: String) -> Self {
        Self::String(id)
    }
}

impl From<i64> for JsonRpcId {
    fn from(id: i64) -> Self {
        Self::Number(id.into())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
    #[serde(default)]
    pub id: Option<JsonRpcId>,
}

impl JsonRpcRequest {
    pub fn new(id: impl Into<JsonRpcId>, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params: Some(params),
            id: Some(id.into()),
        }
    }

    /// Check the raw shape of a request before it is parsed into a [`JsonRpcRequest`].
    ///
    /// `jsonrpc` must be `"2.0"`, `method` a string, `id` absent/null/string/number
    /// and `params` absent/null/array/object.
    pub fn validate_shape(raw: &Value) -> Result<(), ProtocolError> {
        let invalid = || ProtocolError::invalid_request("Invalid JSON-RPC request structure.");
        let obj = raw.as_object().ok_or_else(invalid)?;

        if obj.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
            return Err(invalid());
        }
        if !obj.get("method").is_some_and(Value::is_string) {
            return Err(invalid());
        }
        match obj.get("id") {
            None | Some(Value::Null) | Some(Value::String(_)) | Some(Value::Number(_)) => {}
            Some(_) => return Err(invalid()),
        }
        match obj.get("params") {
            None | Some(Value::Null) | Some(Value::Array(_)) | Some(Value::Object(_)) => {}
            Some(_) => return Err(invalid()),
        }
        Ok(())
    }
}

/// Error member of a response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    /// Always written, as `null` when the request had no usable id.
    #[serde(default)]
    pub id: Option<JsonRpcId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorObject>,
}

impl JsonRpcResponse {
    pub fn success(id: Option<JsonRpcId>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Option<JsonRpcId>, error: &ProtocolError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error.to_rpc_error()),
        }
    }

    /// Split the envelope into its result or its error.
    pub fn into_result(self) -> Result<Value, ProtocolError> {
        match (self.error, self.result) {
            (Some(error), _) => Err(ProtocolError::from_rpc_error(error)),
            (None, Some(result)) => Ok(result),
            (None, None) => Ok(Value::Null),
        }
    }
}
