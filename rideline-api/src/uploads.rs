use axum::{
    body::Bytes,
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UploadParams {
    pub filename: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
}

/// POST /v1/uploads/licence?filename=licence.jpg
/// Pass-through to the object storage collaborator. Only the returned
/// durable URL is ever stored, on the registration's experience snapshot.
pub async fn upload_licence(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> Result<Json<UploadResponse>, ApiError> {
    if body.is_empty() {
        return Err(ApiError::invalid_field("file", "empty upload"));
    }

    let filename = params.filename.unwrap_or_else(|| "licence.jpg".to_string());
    let url = state
        .storage
        .put(&filename, body.to_vec())
        .await
        .map_err(|e| ApiError::Upstream(e.to_string()))?;

    Ok(Json(UploadResponse { url }))
}
