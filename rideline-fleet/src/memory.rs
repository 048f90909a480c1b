use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::inventory::{self, DecrementRequest, InventoryError};
use crate::repository::{UnitRepoError, UnitRepository};
use crate::unit::RentableUnit;

/// In-memory fleet repository. Backs tests and local development; the store
/// crate provides the Postgres implementation. The whole map sits behind one
/// lock, so the check-then-subtract of a decrement is atomic per call, which
/// is exactly the guarantee the persisted variant gets from its conditional
/// UPDATE.
#[derive(Default)]
pub struct MemoryUnitRepository {
    units: Mutex<HashMap<Uuid, RentableUnit>>,
}

impl MemoryUnitRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_units(units: Vec<RentableUnit>) -> Self {
        let map = units.into_iter().map(|u| (u.id, u)).collect();
        Self {
            units: Mutex::new(map),
        }
    }
}

#[async_trait]
impl UnitRepository for MemoryUnitRepository {
    async fn create_unit(&self, unit: &RentableUnit) -> Result<Uuid, UnitRepoError> {
        let mut units = self.units.lock().unwrap();
        if units.values().any(|u| u.name == unit.name) {
            return Err(UnitRepoError::DuplicateName(unit.name.clone()));
        }
        units.insert(unit.id, unit.clone());
        Ok(unit.id)
    }

    async fn get_unit(
        &self,
        id: Uuid,
    ) -> Result<Option<RentableUnit>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.units.lock().unwrap().get(&id).cloned())
    }

    async fn get_unit_by_name(
        &self,
        name: &str,
    ) -> Result<Option<RentableUnit>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self
            .units
            .lock()
            .unwrap()
            .values()
            .find(|u| u.name == name)
            .cloned())
    }

    async fn list_units(
        &self,
        include_inactive: bool,
    ) -> Result<Vec<RentableUnit>, Box<dyn std::error::Error + Send + Sync>> {
        let mut units: Vec<RentableUnit> = self
            .units
            .lock()
            .unwrap()
            .values()
            .filter(|u| include_inactive || u.active)
            .cloned()
            .collect();
        units.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(units)
    }

    async fn update_unit(
        &self,
        unit: &RentableUnit,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut units = self.units.lock().unwrap();
        if !units.contains_key(&unit.id) {
            return Err(format!("unit not found: {}", unit.id).into());
        }
        units.insert(unit.id, unit.clone());
        Ok(())
    }

    async fn retire_unit(
        &self,
        id: Uuid,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut units = self.units.lock().unwrap();
        match units.get_mut(&id) {
            Some(unit) => {
                unit.retire();
                Ok(())
            }
            None => Err(format!("unit not found: {id}").into()),
        }
    }

    async fn decrement(&self, request: &DecrementRequest) -> Result<(), InventoryError> {
        let mut units = self.units.lock().unwrap();
        let unit = units
            .values_mut()
            .find(|u| u.name == request.unit_name() && u.active)
            .ok_or_else(|| InventoryError::NotFound(request.unit_name().to_string()))?;
        inventory::apply(unit, request.amount())
    }
}
