use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::sync::Arc;
use uuid::Uuid;

use rideline_fleet::{DecrementRequest, UnitRepository};

use crate::models::PaymentStatus;
use crate::repository::RegistrationRepository;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the hex-encoded HMAC-SHA256 of the raw request body.
pub const SIGNATURE_HEADER: &str = "x-payment-signature";

pub const EVENT_COMPLETED: &str = "checkout.completed";
pub const EVENT_FAILED: &str = "checkout.failed";

#[derive(Debug, Deserialize)]
pub struct PaymentEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: PaymentEventData,
}

#[derive(Debug, Deserialize)]
pub struct PaymentEventData {
    pub registration_id: Uuid,
    pub session_id: Option<String>,
    pub amount_cents: Option<i64>,
}

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("webhook signature invalid")]
    SignatureInvalid,

    #[error("webhook payload malformed: {0}")]
    Malformed(String),
}

/// Verify the collaborator's signature over the raw body. Nothing in the
/// payload is trusted — or even parsed — until this passes. The comparison
/// is constant-time via the hmac crate's verify.
pub fn verify_signature(secret: &str, body: &[u8], signature_hex: &str) -> Result<(), WebhookError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| WebhookError::SignatureInvalid)?;
    mac.update(body);
    let expected = hex::decode(signature_hex.trim()).map_err(|_| WebhookError::SignatureInvalid)?;
    mac.verify_slice(&expected)
        .map_err(|_| WebhookError::SignatureInvalid)
}

/// Counterpart used by tests and local tooling to produce a valid signature.
pub fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

pub fn parse_event(body: &[u8]) -> Result<PaymentEvent, WebhookError> {
    serde_json::from_slice(body).map_err(|e| WebhookError::Malformed(e.to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// First delivery: the status transition happened.
    Applied,
    /// The document had already left `pending` — a replayed delivery.
    Replayed,
    /// Unknown event type or unknown registration; acknowledged and dropped.
    Ignored,
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("store failure: {0}")]
    Store(String),
}

/// Applies verified payment events to registrations. The conditional
/// status transition is the idempotency guard: a replayed webhook finds the
/// document already settled and becomes a no-op, so side effects (the
/// inventory decrement in particular) run at most once per registration.
pub struct WebhookProcessor {
    registrations: Arc<dyn RegistrationRepository>,
    units: Arc<dyn UnitRepository>,
}

impl WebhookProcessor {
    pub fn new(
        registrations: Arc<dyn RegistrationRepository>,
        units: Arc<dyn UnitRepository>,
    ) -> Self {
        Self {
            registrations,
            units,
        }
    }

    pub async fn process(&self, event: &PaymentEvent) -> Result<WebhookOutcome, ProcessError> {
        let registration_id = event.data.registration_id;

        match event.kind.as_str() {
            EVENT_COMPLETED => {
                let Some(registration) = self
                    .registrations
                    .get(registration_id)
                    .await
                    .map_err(|e| ProcessError::Store(e.to_string()))?
                else {
                    tracing::warn!(registration_id = %registration_id, event_id = %event.id, "payment event for unknown registration");
                    return Ok(WebhookOutcome::Ignored);
                };

                let transitioned = self
                    .registrations
                    .mark_status_if_pending(registration_id, PaymentStatus::Paid)
                    .await
                    .map_err(|e| ProcessError::Store(e.to_string()))?;
                if !transitioned {
                    tracing::info!(registration_id = %registration_id, event_id = %event.id, "replayed payment event, no-op");
                    return Ok(WebhookOutcome::Replayed);
                }

                tracing::info!(registration_id = %registration_id, "registration marked paid via webhook");

                // Inventory is consumed only now, on the first confirmation.
                if let Some(unit_name) = registration.hired_unit() {
                    if let Err(e) = self
                        .units
                        .decrement(&DecrementRequest::one(unit_name))
                        .await
                    {
                        tracing::error!(
                            registration_id = %registration_id,
                            unit = %unit_name,
                            error = %e,
                            "inventory decrement failed after payment confirmation; manual reconciliation required"
                        );
                    }
                }

                Ok(WebhookOutcome::Applied)
            }
            EVENT_FAILED => {
                let transitioned = self
                    .registrations
                    .mark_status_if_pending(registration_id, PaymentStatus::Failed)
                    .await
                    .map_err(|e| ProcessError::Store(e.to_string()))?;
                if transitioned {
                    tracing::info!(registration_id = %registration_id, "registration marked failed via webhook");
                    Ok(WebhookOutcome::Applied)
                } else {
                    Ok(WebhookOutcome::Replayed)
                }
            }
            other => {
                tracing::info!(kind = other, event_id = %event.id, "ignoring unhandled payment event type");
                Ok(WebhookOutcome::Ignored)
            }
        }
    }
}
