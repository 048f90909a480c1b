use async_trait::async_trait;
use uuid::Uuid;

use crate::inventory::{DecrementRequest, InventoryError};
use crate::unit::RentableUnit;

#[derive(Debug, thiserror::Error)]
pub enum UnitRepoError {
    #[error("unit name already exists: {0}")]
    DuplicateName(String),

    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

/// Repository trait for fleet data access.
#[async_trait]
pub trait UnitRepository: Send + Sync {
    async fn create_unit(&self, unit: &RentableUnit) -> Result<Uuid, UnitRepoError>;

    async fn get_unit(
        &self,
        id: Uuid,
    ) -> Result<Option<RentableUnit>, Box<dyn std::error::Error + Send + Sync>>;

    async fn get_unit_by_name(
        &self,
        name: &str,
    ) -> Result<Option<RentableUnit>, Box<dyn std::error::Error + Send + Sync>>;

    async fn list_units(
        &self,
        include_inactive: bool,
    ) -> Result<Vec<RentableUnit>, Box<dyn std::error::Error + Send + Sync>>;

    async fn update_unit(
        &self,
        unit: &RentableUnit,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn retire_unit(
        &self,
        id: Uuid,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Atomically subtract stock from a unit. Implementations must execute
    /// the check and the subtraction as one conditional operation per unit;
    /// a separate read followed by a separate write loses updates under
    /// concurrent bookings.
    async fn decrement(&self, request: &DecrementRequest) -> Result<(), InventoryError>;
}
