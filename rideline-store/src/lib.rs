pub mod app_config;
pub mod database;
pub mod profile_repo;
pub mod redis_repo;
pub mod registration_repo;
pub mod unit_repo;

pub use database::DbClient;
pub use profile_repo::StoreProfileRepository;
pub use redis_repo::RedisClient;
pub use registration_repo::StoreRegistrationRepository;
pub use unit_repo::StoreUnitRepository;
