use std::sync::Arc;

use rideline_booking::webhook::WebhookProcessor;
use rideline_booking::{ProfileRepository, RegistrationRepository, RegistrationWorkflow};
use rideline_core::collaborators::ObjectStorage;
use rideline_fleet::UnitRepository;
use rideline_store::RedisClient;

#[derive(Clone)]
pub struct AuthSettings {
    pub secret: String,
}

#[derive(Clone)]
pub struct PaymentSettings {
    pub webhook_secret: String,
}

#[derive(Clone)]
pub struct CacheSettings {
    pub profile_ttl_seconds: u64,
    pub rate_limit_per_minute: i64,
}

#[derive(Clone)]
pub struct AppState {
    pub units: Arc<dyn UnitRepository>,
    pub registrations: Arc<dyn RegistrationRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub workflow: Arc<RegistrationWorkflow>,
    pub webhooks: Arc<WebhookProcessor>,
    pub storage: Arc<dyn ObjectStorage>,
    pub redis: Arc<RedisClient>,
    pub auth: AuthSettings,
    pub payment: PaymentSettings,
    pub cache: CacheSettings,
}
