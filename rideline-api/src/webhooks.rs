use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};

use rideline_booking::webhook::{self, ProcessError, WebhookError, SIGNATURE_HEADER};

use crate::error::ApiError;
use crate::state::AppState;

/// POST /v1/webhooks/payments
/// Receive signed payment outcomes from the payment collaborator.
///
/// The signature is verified over the raw body before anything is parsed;
/// unverified events are never processed. Store failures surface as 5xx so
/// the collaborator redelivers, and replays are acknowledged as no-ops.
pub async fn handle_payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    // 1. Fail closed without a valid signature
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok())
        .ok_or(ApiError::SignatureInvalid)?;

    webhook::verify_signature(&state.payment.webhook_secret, &body, signature)
        .map_err(|_| ApiError::SignatureInvalid)?;

    // 2. Parse the now-trusted payload
    let event = webhook::parse_event(&body).map_err(|e| match e {
        WebhookError::Malformed(msg) => ApiError::invalid_field("payload", &msg),
        WebhookError::SignatureInvalid => ApiError::SignatureInvalid,
    })?;

    tracing::info!("Received payment webhook: {} ({})", event.kind, event.id);

    // 3. Apply. The processor's conditional transition makes replays no-ops.
    match state.webhooks.process(&event).await {
        Ok(_) => Ok(StatusCode::OK),
        Err(ProcessError::Store(msg)) => Err(ApiError::internal(msg)),
    }
}
