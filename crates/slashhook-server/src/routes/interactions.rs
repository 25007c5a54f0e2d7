//! Interaction webhook receiver.
//!
//! The platform POSTs every interaction here with an Ed25519 signature over
//! the timestamp and raw body. The body is kept as bytes so the signature
//! is checked against exactly what was sent.

use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use slashhook_core::{SIGNATURE_HEADER, TIMESTAMP_HEADER};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, warn};

/// POST {interactions_path} - Receive an interaction.
pub async fn receive(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let received_at = Instant::now();
    let signature = header_str(&headers, SIGNATURE_HEADER);
    let timestamp = header_str(&headers, TIMESTAMP_HEADER);

    match state
        .dispatcher
        .dispatch(&body, signature, timestamp, received_at)
        .await
    {
        Ok(response) => {
            debug!(
                target: "slashhook::dispatch",
                "Responded in {:?}",
                received_at.elapsed()
            );
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => {
            let status = StatusCode::from_u16(err.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            if status.is_server_error() {
                error!(target: "slashhook::dispatch", "Interaction failed: {}", err);
            } else {
                warn!(target: "slashhook::dispatch", "Rejected interaction ({}): {}", status, err);
            }
            (status, err.to_string()).into_response()
        }
    }
}

/// Header value as a string, empty when missing or not valid UTF-8.
fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}
