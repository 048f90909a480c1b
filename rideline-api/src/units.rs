use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

use rideline_fleet::RentableUnit;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UnitResponse {
    pub id: Uuid,
    pub name: String,
    pub daily_rate_cents: i64,
    pub remaining: i32,
    pub available: bool,
    pub specs: BTreeMap<String, String>,
}

impl From<RentableUnit> for UnitResponse {
    fn from(unit: RentableUnit) -> Self {
        Self {
            id: unit.id,
            name: unit.name,
            daily_rate_cents: unit.daily_rate_cents,
            remaining: unit.remaining,
            available: unit.available,
            specs: unit.specs,
        }
    }
}

/// GET /v1/units
/// Active fleet, for the public booking form.
pub async fn list_units(State(state): State<AppState>) -> Result<Json<Vec<UnitResponse>>, ApiError> {
    let units = state
        .units
        .list_units(false)
        .await
        .map_err(ApiError::internal)?;

    Ok(Json(units.into_iter().map(UnitResponse::from).collect()))
}

/// GET /v1/units/{name}
pub async fn get_unit(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<UnitResponse>, ApiError> {
    let unit = state
        .units
        .get_unit_by_name(&name)
        .await
        .map_err(ApiError::internal)?
        .filter(|u| u.active)
        .ok_or_else(|| ApiError::NotFound(format!("unit not found: {name}")))?;

    Ok(Json(unit.into()))
}
