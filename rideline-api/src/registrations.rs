use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Serialize;
use uuid::Uuid;

use rideline_booking::models::{Registration, RegistrationPayload};
use rideline_booking::pricing::Quote;
use rideline_core::identity::AuthIdentity;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub registration_id: Uuid,
    pub quote: Quote,
    pub session_id: String,
    pub redirect_url: Option<String>,
}

/// POST /v1/registrations
/// Terminal submission of the multi-step form. Validation, the authoritative
/// quote, persistence, and checkout-session creation all happen in the
/// workflow; this handler only supplies the authenticated owner.
pub async fn submit_registration(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthIdentity>,
    Json(payload): Json<RegistrationPayload>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let outcome = state.workflow.submit(payload, &identity.subject).await?;

    // The profile bag just changed server-side; drop the advisory cache so
    // the next autofill read re-seeds from the store.
    let _ = state.redis.del_cached_profile(&identity.subject).await;

    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            registration_id: outcome.registration_id,
            quote: outcome.quote,
            session_id: outcome.session.id,
            redirect_url: outcome.session.redirect_url,
        }),
    ))
}

/// GET /v1/registrations
/// The caller's own documents, newest first.
pub async fn list_my_registrations(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthIdentity>,
) -> Result<Json<Vec<Registration>>, ApiError> {
    let registrations = state
        .registrations
        .list_for_owner(&identity.subject)
        .await
        .map_err(ApiError::internal)?;

    Ok(Json(registrations))
}

/// GET /v1/registrations/{id}
/// Owner or admin only.
pub async fn get_registration(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthIdentity>,
    Path(id): Path<Uuid>,
) -> Result<Json<Registration>, ApiError> {
    let registration = state
        .registrations
        .get(id)
        .await
        .map_err(ApiError::internal)?
        .ok_or_else(|| ApiError::NotFound(format!("registration not found: {id}")))?;

    if registration.owner_id != identity.subject && !identity.is_admin() {
        return Err(ApiError::Forbidden(
            "registration belongs to another rider".to_string(),
        ));
    }

    Ok(Json(registration))
}

/// POST /v1/profile/autosave
/// Incremental best-effort save of form fields as the client advances
/// through steps. Always succeeds from the client's point of view; a store
/// failure is logged, and the advisory cache is only refreshed after the
/// store write is confirmed.
pub async fn autosave_profile(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthIdentity>,
    Json(fields): Json<serde_json::Value>,
) -> StatusCode {
    match state.profiles.save_fields(&identity.subject, &fields).await {
        Ok(()) => {
            if let Ok(Some(merged)) = state.profiles.get_fields(&identity.subject).await {
                if let Ok(serialized) = serde_json::to_string(&merged) {
                    let _ = state
                        .redis
                        .set_cached_profile(
                            &identity.subject,
                            &serialized,
                            state.cache.profile_ttl_seconds,
                        )
                        .await;
                }
            }
        }
        Err(e) => {
            tracing::warn!(owner_id = %identity.subject, error = %e, "profile auto-save failed");
        }
    }
    StatusCode::NO_CONTENT
}

/// GET /v1/profile
/// Autofill source for future forms. Read-through: the Redis copy is
/// advisory only and any cache error counts as a miss against the
/// authoritative store.
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthIdentity>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if let Ok(Some(cached)) = state.redis.get_cached_profile(&identity.subject).await {
        if let Ok(fields) = serde_json::from_str::<serde_json::Value>(&cached) {
            return Ok(Json(fields));
        }
    }

    let fields = state
        .profiles
        .get_fields(&identity.subject)
        .await
        .map_err(ApiError::internal)?
        .unwrap_or_else(|| serde_json::json!({}));

    if let Ok(serialized) = serde_json::to_string(&fields) {
        let _ = state
            .redis
            .set_cached_profile(
                &identity.subject,
                &serialized,
                state.cache.profile_ttl_seconds,
            )
            .await;
    }

    Ok(Json(fields))
}
