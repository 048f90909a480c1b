use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::util::ServiceExt;

use rideline_api::middleware::auth::Claims;
use rideline_api::state::{AppState, AuthSettings, CacheSettings, PaymentSettings};
use rideline_api::app;
use rideline_booking::memory::{MemoryProfileRepository, MemoryRegistrationRepository};
use rideline_booking::pricing::FeeSchedule;
use rideline_booking::webhook::{self, WebhookProcessor, SIGNATURE_HEADER};
use rideline_booking::RegistrationWorkflow;
use rideline_core::collaborators::{LogMailer, MockObjectStorage};
use rideline_core::identity::Role;
use rideline_core::payment::MockPaymentGateway;
use rideline_fleet::memory::MemoryUnitRepository;
use rideline_fleet::UnitRepository;
use rideline_store::RedisClient;

const JWT_SECRET: &str = "test-secret";
const WEBHOOK_SECRET: &str = "test-webhook-secret";

struct TestContext {
    app: Router,
    units: Arc<MemoryUnitRepository>,
    registrations: Arc<MemoryRegistrationRepository>,
}

async fn test_context() -> TestContext {
    let units = Arc::new(MemoryUnitRepository::new());
    let registrations = Arc::new(MemoryRegistrationRepository::new());
    let profiles = Arc::new(MemoryProfileRepository::new());

    let mut add_on_rates = std::collections::BTreeMap::new();
    add_on_rates.insert("panniers".to_string(), 1_500);
    add_on_rates.insert("gps".to_string(), 1_000);
    let fees = FeeSchedule {
        base_fee_cents: 119_000,
        partner_fee_cents: 89_000,
        deposit_cents: 49_900,
        merchant_fee_bps: 300,
        add_on_rates,
    };

    let workflow = Arc::new(RegistrationWorkflow::new(
        units.clone(),
        registrations.clone(),
        profiles.clone(),
        Arc::new(MockPaymentGateway),
        Arc::new(LogMailer),
        fees,
        "AUD",
    ));
    let webhooks = Arc::new(WebhookProcessor::new(registrations.clone(), units.clone()));

    // Never connected in tests; the rate limiter fails open on cache errors.
    let redis = Arc::new(RedisClient::new("redis://127.0.0.1:6379").await.unwrap());

    let state = AppState {
        units: units.clone(),
        registrations: registrations.clone(),
        profiles,
        workflow,
        webhooks,
        storage: Arc::new(MockObjectStorage::new("https://assets.example.test")),
        redis,
        auth: AuthSettings {
            secret: JWT_SECRET.to_string(),
        },
        payment: PaymentSettings {
            webhook_secret: WEBHOOK_SECRET.to_string(),
        },
        cache: CacheSettings {
            profile_ttl_seconds: 60,
            rate_limit_per_minute: 1_000,
        },
    };

    TestContext {
        app: app(state),
        units,
        registrations,
    }
}

fn token_with_exp(sub: &str, role: Role, exp: i64) -> String {
    let claims = Claims {
        sub: sub.to_string(),
        role,
        exp: exp as usize,
    };
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

fn token(sub: &str, role: Role) -> String {
    token_with_exp(sub, role, chrono::Utc::now().timestamp() + 3_600)
}

fn get(uri: &str, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(t) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, bearer: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(t) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn registration_payload(unit_name: &str) -> Value {
    json!({
        "personal": {
            "first_name": "Alex",
            "last_name": "Munro",
            "email": "alex@example.com",
            "phone": "+61 400 123 456",
            "date_of_birth": "1987-03-14",
            "address": "12 Harbour St, Hobart",
            "country": "AU"
        },
        "emergency_contacts": [
            { "name": "Jordan Munro", "relationship": "partner", "phone": "+61 400 654 321" }
        ],
        "medical": {
            "conditions": "none",
            "medications": "none",
            "allergies": "none",
            "dietary_requirements": null,
            "fit_to_ride": true
        },
        "experience": {
            "years_riding": 12,
            "licence_type": "unrestricted",
            "licence_number": "TAS123456",
            "licence_photo_url": null,
            "off_road_level": "intermediate"
        },
        "logistics": {
            "arrival_date": "2026-11-02",
            "departure_date": "2026-11-09",
            "accommodation": null,
            "has_partner": false,
            "partner_name": null
        },
        "bike": {
            "choice": "hire",
            "unit_name": unit_name,
            "number_of_days": 7,
            "add_ons": ["panniers"],
            "bike_make": null,
            "bike_model": null,
            "bike_year": null
        },
        "review": {
            "terms_agreed": true,
            "payment_option": "deposit",
            "gift_voucher_cents": 0
        }
    })
}

fn completed_event(registration_id: &str) -> Value {
    json!({
        "id": "evt_1",
        "type": "checkout.completed",
        "data": {
            "registration_id": registration_id,
            "session_id": "cs_1",
            "amount_cents": 51_397
        }
    })
}

fn signed_webhook(body: &Value, secret: &str) -> Request<Body> {
    let raw = body.to_string();
    let signature = webhook::sign(secret, raw.as_bytes());
    Request::builder()
        .method("POST")
        .uri("/v1/webhooks/payments")
        .header(header::CONTENT_TYPE, "application/json")
        .header(SIGNATURE_HEADER, signature)
        .body(Body::from(raw))
        .unwrap()
}

#[tokio::test]
async fn fleet_listing_is_public() {
    let ctx = test_context().await;
    let response = ctx.app.clone().oneshot(get("/v1/units", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn registrations_require_a_credential() {
    let ctx = test_context().await;

    let response = ctx
        .app
        .clone()
        .oneshot(post_json("/v1/registrations", None, &registration_payload("x")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = ctx
        .app
        .clone()
        .oneshot(post_json(
            "/v1/registrations",
            Some("not-a-jwt"),
            &registration_payload("x"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn expired_credentials_are_rejected() {
    let ctx = test_context().await;
    let stale = token_with_exp("rider-1", Role::User, chrono::Utc::now().timestamp() - 600);

    let response = ctx
        .app
        .clone()
        .oneshot(get("/v1/registrations", Some(&stale)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn user_role_cannot_reach_admin_routes() {
    let ctx = test_context().await;

    let response = ctx
        .app
        .clone()
        .oneshot(get("/v1/admin/registrations", Some(&token("rider-1", Role::User))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = ctx
        .app
        .clone()
        .oneshot(get("/v1/admin/registrations", Some(&token("staff-1", Role::Admin))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn invalid_submission_returns_field_errors_and_persists_nothing() {
    let ctx = test_context().await;
    let mut payload = registration_payload("tenere-700");
    payload["review"]["terms_agreed"] = json!(false);

    let response = ctx
        .app
        .clone()
        .oneshot(post_json(
            "/v1/registrations",
            Some(&token("rider-1", Role::User)),
            &payload,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert!(body["fields"]["review.terms_agreed"].is_string());
    assert_eq!(ctx.registrations.count(), 0);
}

#[tokio::test]
async fn booking_flow_decrements_inventory_exactly_once() {
    let ctx = test_context().await;
    let admin = token("staff-1", Role::Admin);
    let rider = token("rider-1", Role::User);

    // 1. Admin stocks the fleet with the last available bike
    let response = ctx
        .app
        .clone()
        .oneshot(post_json(
            "/v1/admin/units",
            Some(&admin),
            &json!({ "name": "tenere-700", "daily_rate_cents": 18_500, "remaining": 1 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // 2. Rider submits; document is pending, inventory untouched
    let response = ctx
        .app
        .clone()
        .oneshot(post_json(
            "/v1/registrations",
            Some(&rider),
            &registration_payload("tenere-700"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    let registration_id = body["registration_id"].as_str().unwrap().to_string();
    assert_eq!(body["quote"]["total_cents"], json!(51_397));
    assert!(body["session_id"].as_str().unwrap().starts_with("mock_cs_"));

    let unit = ctx.units.get_unit_by_name("tenere-700").await.unwrap().unwrap();
    assert_eq!(unit.remaining, 1, "submission must not consume inventory");

    // 3. Payment confirmation arrives; stock is consumed
    let event = completed_event(&registration_id);
    let response = ctx
        .app
        .clone()
        .oneshot(signed_webhook(&event, WEBHOOK_SECRET))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let unit = ctx.units.get_unit_by_name("tenere-700").await.unwrap().unwrap();
    assert_eq!(unit.remaining, 0);
    assert!(!unit.available);

    // 4. Replay of the same event is acknowledged but changes nothing
    let response = ctx
        .app
        .clone()
        .oneshot(signed_webhook(&event, WEBHOOK_SECRET))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let unit = ctx.units.get_unit_by_name("tenere-700").await.unwrap().unwrap();
    assert_eq!(unit.remaining, 0, "replay must not double-decrement");

    // 5. The rider sees the settled document
    let response = ctx
        .app
        .clone()
        .oneshot(get(&format!("/v1/registrations/{registration_id}"), Some(&rider)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["payment"]["status"], json!("paid"));
}

#[tokio::test]
async fn webhook_fails_closed_without_a_valid_signature() {
    let ctx = test_context().await;
    let event = completed_event(&uuid::Uuid::new_v4().to_string());

    // Wrong secret
    let response = ctx
        .app
        .clone()
        .oneshot(signed_webhook(&event, "some-other-secret"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Missing header entirely
    let response = ctx
        .app
        .clone()
        .oneshot(post_json("/v1/webhooks/payments", None, &event))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn riders_cannot_read_each_others_registrations() {
    let ctx = test_context().await;
    let admin = token("staff-1", Role::Admin);

    ctx.app
        .clone()
        .oneshot(post_json(
            "/v1/admin/units",
            Some(&admin),
            &json!({ "name": "tenere-700", "daily_rate_cents": 18_500, "remaining": 5 }),
        ))
        .await
        .unwrap();

    let response = ctx
        .app
        .clone()
        .oneshot(post_json(
            "/v1/registrations",
            Some(&token("rider-1", Role::User)),
            &registration_payload("tenere-700"),
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    let registration_id = body["registration_id"].as_str().unwrap().to_string();

    let response = ctx
        .app
        .clone()
        .oneshot(get(
            &format!("/v1/registrations/{registration_id}"),
            Some(&token("rider-2", Role::User)),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Admin override path honours the transition table
    let response = ctx
        .app
        .clone()
        .oneshot(post_json(
            &format!("/v1/admin/registrations/{registration_id}/payment-status"),
            Some(&admin),
            &json!({ "status": "cancelled" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // A second override finds the document already settled
    let response = ctx
        .app
        .clone()
        .oneshot(post_json(
            &format!("/v1/admin/registrations/{registration_id}/payment-status"),
            Some(&admin),
            &json!({ "status": "paid" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}
