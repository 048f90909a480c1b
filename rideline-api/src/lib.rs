use axum::{
    extract::{ConnectInfo, Request, State},
    http::{Method, StatusCode},
    middleware::Next,
    response::Response,
    routing::{get, post, put},
    Router,
};
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod admin;
pub mod error;
pub mod middleware;
pub mod registrations;
pub mod state;
pub mod units;
pub mod uploads;
pub mod webhooks;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    // CORS Middleware
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    // Public surface: fleet browsing and the signed payment webhook (which
    // authenticates via its signature, not a bearer token).
    let public = Router::new()
        .route("/v1/units", get(units::list_units))
        .route("/v1/units/{name}", get(units::get_unit))
        .route("/v1/webhooks/payments", post(webhooks::handle_payment_webhook));

    let authed = Router::new()
        .route(
            "/v1/registrations",
            post(registrations::submit_registration).get(registrations::list_my_registrations),
        )
        .route("/v1/registrations/{id}", get(registrations::get_registration))
        .route("/v1/profile", get(registrations::get_profile))
        .route("/v1/profile/autosave", post(registrations::autosave_profile))
        .route("/v1/uploads/licence", post(uploads::upload_licence))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::user_auth_middleware,
        ));

    let admin_routes = Router::new()
        .route("/v1/admin/units", post(admin::create_unit).get(admin::list_units))
        .route(
            "/v1/admin/units/{id}",
            put(admin::update_unit).delete(admin::retire_unit),
        )
        .route("/v1/admin/registrations", get(admin::list_registrations))
        .route(
            "/v1/admin/registrations/{id}/payment-status",
            post(admin::override_payment_status),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::admin_auth_middleware,
        ));

    Router::new()
        .merge(public)
        .merge(authed)
        .merge(admin_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .with_state(state)
}

async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, (StatusCode, &'static str)> {
    // Connect info is only present when served with connect-info; requests
    // without it (tests) pass through.
    let Some(ip) = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
    else {
        return Ok(next.run(req).await);
    };

    let key = format!("ratelimit:{}", ip);
    match state
        .redis
        .check_rate_limit(&key, state.cache.rate_limit_per_minute, 60)
        .await
    {
        Ok(true) => Ok(next.run(req).await),
        Ok(false) => Err((StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded")),
        Err(_) => Ok(next.run(req).await), // Fail open
    }
}
