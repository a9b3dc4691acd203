//! Health check endpoint for liveness probes.

use axum::http::StatusCode;

/// Returns 200 whenever the server is able to answer at all.
pub async fn health_handler() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}
