use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use rideline_core::identity::{require_role, AuthIdentity, Role};

use crate::error::ApiError;
use crate::state::AppState;

// ============================================================================
// JWT Claims
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    /// Absent role claims fall back to the least-privileged role.
    #[serde(default)]
    pub role: Role,
    pub exp: usize,
}

/// The stateless access gate: extract the bearer credential, verify its
/// signature and expiry against the server secret, and produce the identity
/// downstream handlers read from request extensions.
fn authenticate(state: &AppState, req: &Request) -> Result<AuthIdentity, ApiError> {
    // 1. Extract token from Authorization header
    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::Unauthenticated("missing bearer credential".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Unauthenticated("malformed authorization header".to_string()))?;

    // 2. Decode and validate JWT (signature + expiry)
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.auth.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| ApiError::InvalidCredential(format!("credential rejected: {e}")))?;

    // 3. A credential without a subject identifies nobody
    if token_data.claims.sub.trim().is_empty() {
        return Err(ApiError::InvalidCredential(
            "credential carries no subject".to_string(),
        ));
    }

    Ok(AuthIdentity {
        subject: token_data.claims.sub,
        role: token_data.claims.role,
    })
}

// ============================================================================
// Middlewares
// ============================================================================

pub async fn user_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = authenticate(&state, &req)?;
    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = authenticate(&state, &req)?;
    require_role(&identity, Role::Admin).map_err(|e| ApiError::Forbidden(e.to_string()))?;
    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}
