use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use rideline_booking::models::{PaymentStatus, Registration};
use rideline_fleet::{DecrementRequest, RentableUnit, UnitRepoError};

use crate::error::ApiError;
use crate::state::AppState;
use crate::units::UnitResponse;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateUnitRequest {
    pub name: String,
    pub daily_rate_cents: i64,
    pub remaining: i32,
    pub specs: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUnitRequest {
    pub name: Option<String>,
    pub daily_rate_cents: Option<i64>,
    pub remaining: Option<i32>,
    pub specs: Option<BTreeMap<String, String>>,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct RegistrationFilter {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OverrideStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct OverrideStatusResponse {
    pub registration_id: Uuid,
    pub status: PaymentStatus,
}

// ============================================================================
// Fleet administration
// ============================================================================

/// POST /v1/admin/units
pub async fn create_unit(
    State(state): State<AppState>,
    Json(req): Json<CreateUnitRequest>,
) -> Result<(StatusCode, Json<UnitResponse>), ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::invalid_field("name", "required"));
    }
    if req.remaining < 0 {
        return Err(ApiError::invalid_field("remaining", "cannot be negative"));
    }

    let mut unit = RentableUnit::new(req.name, req.daily_rate_cents, req.remaining);
    if let Some(specs) = req.specs {
        unit.specs = specs;
    }

    match state.units.create_unit(&unit).await {
        Ok(_) => Ok((StatusCode::CREATED, Json(unit.into()))),
        Err(UnitRepoError::DuplicateName(name)) => {
            Err(ApiError::Conflict(format!("unit name already exists: {name}")))
        }
        Err(UnitRepoError::Other(e)) => Err(ApiError::internal(e)),
    }
}

/// GET /v1/admin/units
/// Whole fleet including retired units.
pub async fn list_units(State(state): State<AppState>) -> Result<Json<Vec<UnitResponse>>, ApiError> {
    let units = state
        .units
        .list_units(true)
        .await
        .map_err(ApiError::internal)?;
    Ok(Json(units.into_iter().map(UnitResponse::from).collect()))
}

/// PUT /v1/admin/units/{id}
pub async fn update_unit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUnitRequest>,
) -> Result<Json<UnitResponse>, ApiError> {
    let mut unit = state
        .units
        .get_unit(id)
        .await
        .map_err(ApiError::internal)?
        .ok_or_else(|| ApiError::NotFound(format!("unit not found: {id}")))?;

    if let Some(name) = req.name {
        unit.name = name;
    }
    if let Some(rate) = req.daily_rate_cents {
        unit.daily_rate_cents = rate;
    }
    if let Some(remaining) = req.remaining {
        if remaining < 0 {
            return Err(ApiError::invalid_field("remaining", "cannot be negative"));
        }
        unit.remaining = remaining;
    }
    if let Some(specs) = req.specs {
        unit.specs = specs;
    }
    if let Some(active) = req.active {
        unit.active = active;
    }
    unit.sync_availability();

    state
        .units
        .update_unit(&unit)
        .await
        .map_err(ApiError::internal)?;

    Ok(Json(unit.into()))
}

/// DELETE /v1/admin/units/{id}
/// Soft delete: the unit is retired, never removed.
pub async fn retire_unit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .units
        .get_unit(id)
        .await
        .map_err(ApiError::internal)?
        .ok_or_else(|| ApiError::NotFound(format!("unit not found: {id}")))?;

    state
        .units
        .retire_unit(id)
        .await
        .map_err(ApiError::internal)?;

    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Registration administration
// ============================================================================

/// GET /v1/admin/registrations?status=pending
pub async fn list_registrations(
    State(state): State<AppState>,
    Query(filter): Query<RegistrationFilter>,
) -> Result<Json<Vec<Registration>>, ApiError> {
    let status = match filter.status.as_deref() {
        None => None,
        Some(raw) => Some(
            PaymentStatus::parse(raw)
                .ok_or_else(|| ApiError::invalid_field("status", "unknown payment status"))?,
        ),
    };

    let registrations = state
        .registrations
        .list_by_status(status)
        .await
        .map_err(ApiError::internal)?;

    Ok(Json(registrations))
}

/// POST /v1/admin/registrations/{id}/payment-status
/// Manual override of the payment outcome — the only mutation path besides
/// the webhook, bound by the same transition table.
pub async fn override_payment_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<OverrideStatusRequest>,
) -> Result<Json<OverrideStatusResponse>, ApiError> {
    let next = PaymentStatus::parse(&req.status)
        .ok_or_else(|| ApiError::invalid_field("status", "unknown payment status"))?;

    if !PaymentStatus::Pending.can_transition(next) {
        return Err(ApiError::Conflict(format!(
            "payment status cannot move to {}",
            next.as_str()
        )));
    }

    let registration = state
        .registrations
        .get(id)
        .await
        .map_err(ApiError::internal)?
        .ok_or_else(|| ApiError::NotFound(format!("registration not found: {id}")))?;

    let transitioned = state
        .registrations
        .mark_status_if_pending(id, next)
        .await
        .map_err(ApiError::internal)?;
    if !transitioned {
        return Err(ApiError::Conflict(format!(
            "registration already settled as {}",
            registration.payment.status.as_str()
        )));
    }

    // A manual "paid" is a payment confirmation like any other: it consumes
    // inventory, and a shortfall is an operator reconciliation case.
    if next == PaymentStatus::Paid {
        if let Some(unit_name) = registration.hired_unit() {
            if let Err(e) = state
                .units
                .decrement(&DecrementRequest::one(unit_name))
                .await
            {
                tracing::error!(
                    registration_id = %id,
                    unit = %unit_name,
                    error = %e,
                    "inventory decrement failed after admin payment override; manual reconciliation required"
                );
            }
        }
    }

    Ok(Json(OverrideStatusResponse {
        registration_id: id,
        status: next,
    }))
}
