use std::time::Instant;

use axum::extract::{Request, State};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

use titan_metrics::StatusClass;

use crate::state::AppState;

/// Telemetry wrapper around every request.
///
/// Invariants: the active-connection gauge moves up and down exactly once per
/// request, and exactly one latency sample is recorded, classified by the
/// response status. Responses pick up `X-Request-ID` and `X-Engine-Lat`
/// headers when the handler did not set them.
pub async fn telemetry(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string()[..8].to_string();
    let start = Instant::now();
    state.metrics.increment_active_connections();

    let mut response = next.run(request).await;

    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    state
        .metrics
        .record_http_request(StatusClass::from_status(response.status().as_u16()), latency_ms);
    state.metrics.decrement_active_connections();

    let headers = response.headers_mut();
    if !headers.contains_key("x-request-id") {
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            headers.insert("X-Request-ID", value);
        }
    }
    if !headers.contains_key("x-engine-lat") {
        if let Ok(value) = HeaderValue::from_str(&format!("{latency_ms:.2}ms")) {
            headers.insert("X-Engine-Lat", value);
        }
    }

    response
}
