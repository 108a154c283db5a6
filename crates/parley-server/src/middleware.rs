//! Request logging middleware.

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use tracing::{error, info, warn};

use crate::state::AppState;

/// Log one line per request: method, path, status, elapsed time and whether
/// the answer is an event stream.
///
/// Streams are logged when their headers go out, not when they close.
pub async fn request_logging_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !state.config.request_logging {
        return next.run(request).await;
    }

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = std::time::Instant::now();

    let response = next.run(request).await;

    let elapsed_ms = start.elapsed().as_millis() as u64;
    let status = response.status();
    let code = status.as_u16();
    let streaming = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/event-stream"));

    if status.is_server_error() {
        error!(%method, %path, status = code, elapsed_ms, streaming, "Request failed");
    } else if status.is_client_error() {
        warn!(%method, %path, status = code, elapsed_ms, streaming, "Request rejected");
    } else {
        info!(%method, %path, status = code, elapsed_ms, streaming, "Request handled");
    }

    response
}
