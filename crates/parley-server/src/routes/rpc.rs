//! The JSON-RPC endpoint.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use parley_types::{
    JsonRpcId, JsonRpcRequest, JsonRpcResponse, ProtocolError, Result, TaskIdParams,
    TaskSendParams, methods,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::sse::event_stream;
use crate::state::AppState;
use crate::tasks::EventStream;

/// What a method answers with.
enum Reply {
    Json(Value),
    Stream(EventStream),
}

/// `POST <base_path>`.
///
/// Protocol failures are answered with HTTP 200 and a JSON-RPC error
/// envelope. Only a body that is not JSON at all gets HTTP 400.
pub async fn rpc_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let raw: Value = match serde_json::from_slice(&body) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, "Request body is not valid JSON");
            let err = ProtocolError::parse_error(e.to_string());
            return (
                StatusCode::BAD_REQUEST,
                Json(JsonRpcResponse::error(None, &err)),
            )
                .into_response();
        }
    };

    let id = raw_id(&raw);
    if let Err(err) = JsonRpcRequest::validate_shape(&raw) {
        return error_response(id, err);
    }
    let request: JsonRpcRequest = match serde_json::from_value(raw) {
        Ok(request) => request,
        Err(_) => {
            return error_response(
                id,
                ProtocolError::invalid_request("Invalid JSON-RPC request structure."),
            );
        }
    };

    let task_hint = request
        .params
        .as_ref()
        .and_then(|p| p.get("id"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    debug!(method = %request.method, task_id = ?task_hint, "Dispatching request");

    match dispatch(&state, &request).await {
        Ok(Reply::Json(result)) => {
            Json(JsonRpcResponse::success(request.id, result)).into_response()
        }
        Ok(Reply::Stream(events)) => event_stream(request.id, events).into_response(),
        Err(mut err) => {
            if err.task_id.is_none() {
                err.task_id = task_hint;
            }
            debug!(
                method = %request.method,
                task_id = ?err.task_id,
                code = err.code(),
                error = %err.message,
                "Request failed"
            );
            error_response(request.id, err)
        }
    }
}

async fn dispatch(state: &AppState, request: &JsonRpcRequest) -> Result<Reply> {
    let params = request.params.as_ref();
    let tasks = &state.tasks;

    match request.method.as_str() {
        methods::SEND => {
            let params = send_params(params)?;
            let task = tasks.send(params).await?;
            Ok(Reply::Json(serde_json::to_value(task)?))
        }
        methods::SEND_SUBSCRIBE => {
            let params = send_params(params)?;
            Ok(Reply::Stream(tasks.send_subscribe(params).await?))
        }
        methods::GET => {
            let params: TaskIdParams = id_params(params)?;
            let task = tasks.get(&params.id).await?;
            Ok(Reply::Json(serde_json::to_value(task)?))
        }
        methods::CANCEL => {
            let params: TaskIdParams = id_params(params)?;
            let task = tasks.cancel(&params.id).await?;
            Ok(Reply::Json(serde_json::to_value(task)?))
        }
        methods::RESUBSCRIBE => {
            let params: TaskIdParams = id_params(params)?;
            Ok(Reply::Stream(tasks.resubscribe(&params.id).await?))
        }
        methods::SET_PUSH_NOTIFICATION | methods::GET_PUSH_NOTIFICATION => {
            Err(ProtocolError::push_notification_not_supported())
        }
        other => Err(ProtocolError::method_not_found(other)),
    }
}

/// Validate and parse `tasks/send` and `tasks/sendSubscribe` params.
fn send_params(params: Option<&Value>) -> Result<TaskSendParams> {
    let Some(obj) = params.and_then(Value::as_object) else {
        return Err(ProtocolError::invalid_params(
            "Missing or invalid params object.",
        ));
    };
    if !obj
        .get("id")
        .and_then(Value::as_str)
        .is_some_and(|id| !id.is_empty())
    {
        return Err(ProtocolError::invalid_params(
            "Invalid or missing task ID (params.id).",
        ));
    }
    if !obj
        .get("message")
        .and_then(|m| m.get("parts"))
        .is_some_and(Value::is_array)
    {
        return Err(ProtocolError::invalid_params(
            "Invalid or missing message object (params.message).",
        ));
    }
    parse_params(obj)
}

/// Parse params that must carry a non-empty task id.
fn id_params<T: DeserializeOwned>(params: Option<&Value>) -> Result<T> {
    let Some(obj) = params
        .and_then(Value::as_object)
        .filter(|obj| obj.get("id").and_then(Value::as_str).is_some_and(|id| !id.is_empty()))
    else {
        return Err(ProtocolError::invalid_params("Missing task ID."));
    };
    parse_params(obj)
}

fn parse_params<T: DeserializeOwned>(obj: &serde_json::Map<String, Value>) -> Result<T> {
    serde_json::from_value(Value::Object(obj.clone()))
        .map_err(|e| ProtocolError::invalid_params(format!("Invalid params: {e}")))
}

/// The request id, when the raw body carries a usable one.
fn raw_id(raw: &Value) -> Option<JsonRpcId> {
    raw.get("id")
        .and_then(|id| serde_json::from_value(id.clone()).ok())
}

fn error_response(id: Option<JsonRpcId>, err: ProtocolError) -> Response {
    Json(JsonRpcResponse::error(id, &err)).into_response()
}
