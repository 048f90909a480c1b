use std::net::SocketAddr;
use std::sync::Arc;

use rideline_api::{app, state::{AppState, AuthSettings, CacheSettings, PaymentSettings}};
use rideline_booking::webhook::WebhookProcessor;
use rideline_booking::RegistrationWorkflow;
use rideline_core::collaborators::{LogMailer, MockObjectStorage};
use rideline_core::payment::MockPaymentGateway;
use rideline_store::{
    DbClient, RedisClient, StoreProfileRepository, StoreRegistrationRepository, StoreUnitRepository,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rideline_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = rideline_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Rideline API on port {}", config.server.port);

    // Postgres Connection + Migrations
    let db = DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    // Redis Connection (advisory cache + rate limiting)
    let redis = RedisClient::new(&config.redis.url)
        .await
        .expect("Failed to connect to Redis");
    let redis_arc = Arc::new(redis);

    // Repositories
    let units = Arc::new(StoreUnitRepository::new(db.pool.clone()));
    let registrations = Arc::new(StoreRegistrationRepository::new(db.pool.clone()));
    let profiles = Arc::new(StoreProfileRepository::new(db.pool.clone()));

    // Collaborators are consumed through traits; deployments swap the mocks
    // for real gateway/SMTP/object-store integrations.
    let gateway = Arc::new(MockPaymentGateway);
    let mailer = Arc::new(LogMailer);
    let storage = Arc::new(MockObjectStorage::new(config.storage.public_base_url.clone()));

    let workflow = Arc::new(RegistrationWorkflow::new(
        units.clone(),
        registrations.clone(),
        profiles.clone(),
        gateway,
        mailer,
        config.booking.fee_schedule(),
        config.payment.currency.clone(),
    ));
    let webhooks = Arc::new(WebhookProcessor::new(registrations.clone(), units.clone()));

    let app_state = AppState {
        units,
        registrations,
        profiles,
        workflow,
        webhooks,
        storage,
        redis: redis_arc,
        auth: AuthSettings {
            secret: config.auth.jwt_secret.clone(),
        },
        payment: PaymentSettings {
            webhook_secret: config.payment.webhook_secret.clone(),
        },
        cache: CacheSettings {
            profile_ttl_seconds: config.booking.profile_cache_ttl_seconds,
            rate_limit_per_minute: config.booking.rate_limit_per_minute,
        },
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap();
}
