use rideline_booking::pricing::FeeSchedule;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub auth: AuthConfig,
    pub payment: PaymentConfig,
    pub storage: StorageConfig,
    pub booking: BookingRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PaymentConfig {
    /// Shared secret for webhook signature verification.
    pub webhook_secret: String,
    pub currency: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub public_base_url: String,
}

/// Operator-tunable booking rules. Amounts are integer cents, the merchant
/// fee is basis points.
#[derive(Debug, Deserialize, Clone)]
pub struct BookingRules {
    pub base_fee_cents: i64,
    pub partner_fee_cents: i64,
    pub deposit_cents: i64,
    pub merchant_fee_bps: i64,
    #[serde(default)]
    pub add_on_rates: BTreeMap<String, i64>,
    pub profile_cache_ttl_seconds: u64,
    pub rate_limit_per_minute: i64,
}

impl BookingRules {
    pub fn fee_schedule(&self) -> FeeSchedule {
        FeeSchedule {
            base_fee_cents: self.base_fee_cents,
            partner_fee_cents: self.partner_fee_cents,
            deposit_cents: self.deposit_cents,
            merchant_fee_bps: self.merchant_fee_bps,
            add_on_rates: self.add_on_rates.clone(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(config::File::with_name("config/default"))
            // Add in the current environment file
            // Default to 'development' env
            // Note that this file is _optional_
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add in a local configuration file
            // This file shouldn't be checked in to git
            .add_source(config::File::with_name("config/local").required(false))
            // Add in settings from the environment (with a prefix of RIDELINE)
            .add_source(config::Environment::with_prefix("RIDELINE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
