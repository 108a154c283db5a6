//! Decoding server-sent task events.

use std::time::Duration;

use eventsource_stream::{EventStreamError, Eventsource};
use futures::stream::BoxStream;
use futures::StreamExt;
use parley_types::{JsonRpcResponse, ProtocolError, TaskEvent};
use tracing::{debug, warn};

use crate::error::{Result, network_error};

/// Events of a streaming call, in arrival order.
pub type TaskEventStream = BoxStream<'static, Result<TaskEvent>>;

/// Decode `data:` frames of `response` into task events.
///
/// Frames that are not JSON-RPC envelopes are skipped. An error envelope is
/// yielded once and ends the stream. So does a silence longer than `idle`;
/// keep-alive comments count as traffic.
pub(crate) fn decode_events(response: reqwest::Response, idle: Duration) -> TaskEventStream {
    Box::pin(async_stream::stream! {
        let mut frames = idle_limited(response, idle).eventsource();

        while let Some(frame) = frames.next().await {
            let frame = match frame {
                Ok(frame) => frame,
                Err(EventStreamError::Transport(err)) => {
                    yield Err(err);
                    break;
                }
                Err(e) => {
                    yield Err(ProtocolError::internal_error(format!("Invalid event stream: {e}")));
                    break;
                }
            };
            if frame.data.is_empty() {
                continue;
            }

            let envelope = match serde_json::from_str::<JsonRpcResponse>(&frame.data) {
                Ok(envelope) => envelope,
                Err(e) => {
                    warn!(data = %frame.data, error = %e, "Skipping malformed stream frame");
                    continue;
                }
            };

            match envelope.into_result() {
                Ok(result) => match serde_json::from_value::<TaskEvent>(result) {
                    Ok(event) => {
                        yield Ok(event);
                    }
                    Err(e) => warn!(error = %e, "Skipping stream frame without a task event"),
                },
                Err(err) => {
                    debug!(code = err.code(), error = %err.message, "Stream ended with error");
                    yield Err(err);
                    break;
                }
            }
        }
    })
}

/// The body chunks of `response`, failing once no chunk arrives for `idle`.
fn idle_limited(
    response: reqwest::Response,
    idle: Duration,
) -> BoxStream<'static, Result<bytes::Bytes>> {
    Box::pin(async_stream::stream! {
        let mut chunks = Box::pin(response.bytes_stream());
        loop {
            match tokio::time::timeout(idle, chunks.next()).await {
                Ok(Some(chunk)) => yield chunk.map_err(network_error),
                Ok(None) => break,
                Err(_) => {
                    yield Err(ProtocolError::internal_error(format!(
                        "Network error: no stream data for {idle:?}"
                    )));
                    break;
                }
            }
        }
    })
}
