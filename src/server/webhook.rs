//! Webhook endpoint handler.
//!
//! The tracker expects a fast acknowledgement, so the handler does exactly
//! two things inline: verify the signature over the raw body, and hand the
//! body to a background task. Everything after the 200 (parsing,
//! normalization, admission, dispatch) is invisible to the sender; a
//! delivery that turns out to be irrelevant or malformed was still
//! acknowledged, and that is fine because the poll path will re-observe
//! anything that mattered.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{debug, error, warn};

use super::AppState;
use crate::ingest;
use crate::ledger::TriggerSource;
use crate::normalize::normalize_push;
use crate::webhooks::{parse_push, verify_signature};

/// Header carrying the tracker's HMAC-SHA256 hex signature.
const HEADER_SIGNATURE: &str = "linear-signature";

/// Errors surfaced to the webhook sender.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Missing or invalid signature. Deliberately carries no detail about
    /// which of the two it was.
    #[error("invalid signature")]
    InvalidSignature,
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        match self {
            WebhookError::InvalidSignature => {
                (StatusCode::UNAUTHORIZED, self.to_string()).into_response()
            }
        }
    }
}

/// Webhook handler: verify, acknowledge, process in the background.
pub async fn webhook_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, &'static str), WebhookError> {
    let signature = headers
        .get(HEADER_SIGNATURE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    // Verify over the raw bytes before touching the body. An absent
    // header verifies like an empty signature: fail closed.
    if !verify_signature(&body, signature, &app_state.config().webhook_secret) {
        warn!("rejecting webhook delivery with bad signature");
        return Err(WebhookError::InvalidSignature);
    }

    tokio::spawn(process_delivery(app_state, body));
    Ok((StatusCode::OK, "OK"))
}

/// Background half of the webhook path. Failures here are logged, never
/// reported to the sender; the acknowledgement already went out.
async fn process_delivery(state: AppState, body: Bytes) {
    let payload = match parse_push(&body) {
        Ok(payload) => payload,
        Err(e) => {
            debug!(error = %e, "ignoring unparseable webhook delivery");
            return;
        }
    };

    let Some(candidate) = normalize_push(&payload, state.config()) else {
        debug!(
            entity = %payload.entity_type,
            action = %payload.action,
            "ignoring irrelevant webhook delivery"
        );
        return;
    };

    if let Err(e) = ingest::process_candidate(
        state.ledger(),
        state.spawner(),
        state.config(),
        candidate,
        TriggerSource::Webhook,
    )
    .await
    {
        error!(error = %e, "failed to ingest webhook delivery");
    }
}
