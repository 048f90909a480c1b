use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use rideline_booking::validation::ValidationErrors;
use rideline_booking::workflow::WorkflowError;

#[derive(Debug)]
pub enum ApiError {
    Unauthenticated(String),
    InvalidCredential(String),
    Forbidden(String),
    Validation(ValidationErrors),
    NotFound(String),
    Conflict(String),
    SignatureInvalid,
    Upstream(String),
    Internal(anyhow::Error),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        Self::Internal(anyhow::anyhow!("{err}"))
    }

    /// Single-field validation failure, for request-shape problems outside
    /// the registration payload validators.
    pub fn invalid_field(field: &str, message: &str) -> Self {
        let mut errors = ValidationErrors::new();
        errors.add(field, message);
        Self::Validation(errors)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Unauthenticated(msg) => (StatusCode::UNAUTHORIZED, json!({ "error": msg })),
            ApiError::InvalidCredential(msg) => (StatusCode::UNAUTHORIZED, json!({ "error": msg })),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, json!({ "error": msg })),
            ApiError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "validation failed", "fields": errors.fields() }),
            ),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, json!({ "error": msg })),
            ApiError::SignatureInvalid => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "invalid webhook signature" }),
            ),
            ApiError::Upstream(msg) => {
                tracing::error!("Upstream collaborator failure: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    json!({ "error": "upstream collaborator unavailable" }),
                )
            }
            ApiError::Internal(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal Server Error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::Validation(errors) => ApiError::Validation(errors),
            WorkflowError::UnitNotFound(name) => {
                ApiError::NotFound(format!("unit not found: {name}"))
            }
            WorkflowError::PaymentSession(msg) => ApiError::Upstream(msg),
            WorkflowError::Store(msg) => ApiError::internal(msg),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}
