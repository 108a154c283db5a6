//! Rendering task events as a server-sent event stream.

use std::convert::Infallible;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use parley_types::{JsonRpcId, JsonRpcResponse, ProtocolError};
use serde::Serialize;
use tracing::warn;

use crate::tasks::EventStream;

/// Wrap each event in a JSON-RPC success envelope carrying the request id.
///
/// Each frame goes out as `data: <envelope>`. An event that cannot be
/// serialized is sent as an internal-error envelope instead.
pub fn event_stream(
    id: Option<JsonRpcId>,
    events: EventStream,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let frames = events.map(move |event| Ok(frame(envelope(id.clone(), &event))));

    Sse::new(frames).keep_alive(KeepAlive::default())
}

fn envelope<T: Serialize>(id: Option<JsonRpcId>, item: &T) -> JsonRpcResponse {
    match serde_json::to_value(item) {
        Ok(result) => JsonRpcResponse::success(id, result),
        Err(e) => {
            warn!(error = %e, "Failed to serialize stream event");
            let err = ProtocolError::internal_error(format!("Failed to serialize event: {e}"));
            JsonRpcResponse::error(id, &err)
        }
    }
}

fn frame(envelope: JsonRpcResponse) -> Event {
    match Event::default().json_data(&envelope) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "Failed to encode stream frame");
            Event::default().comment("unencodable event")
        }
    }
}
