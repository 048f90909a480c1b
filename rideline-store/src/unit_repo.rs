use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use rideline_fleet::inventory::{DecrementRequest, InventoryError};
use rideline_fleet::repository::{UnitRepoError, UnitRepository};
use rideline_fleet::RentableUnit;

pub struct StoreUnitRepository {
    pool: PgPool,
}

impl StoreUnitRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn unit_from_row(row: &PgRow) -> Result<RentableUnit, Box<dyn std::error::Error + Send + Sync>> {
    let specs_value: serde_json::Value = row.try_get("specs")?;
    Ok(RentableUnit {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        daily_rate_cents: row.try_get("daily_rate_cents")?,
        remaining: row.try_get("remaining")?,
        available: row.try_get("available")?,
        active: row.try_get("active")?,
        specs: serde_json::from_value(specs_value).unwrap_or_default(),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

const UNIT_COLUMNS: &str =
    "id, name, daily_rate_cents, remaining, available, active, specs, created_at, updated_at";

#[async_trait]
impl UnitRepository for StoreUnitRepository {
    async fn create_unit(&self, unit: &RentableUnit) -> Result<Uuid, UnitRepoError> {
        let specs = serde_json::to_value(&unit.specs)
            .map_err(|e| UnitRepoError::Other(Box::new(e)))?;

        let result = sqlx::query(
            r#"
            INSERT INTO units (id, name, daily_rate_cents, remaining, available, active, specs)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(unit.id)
        .bind(&unit.name)
        .bind(unit.daily_rate_cents)
        .bind(unit.remaining)
        .bind(unit.available)
        .bind(unit.active)
        .bind(specs)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(unit.id),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(UnitRepoError::DuplicateName(unit.name.clone()))
            }
            Err(e) => Err(UnitRepoError::Other(Box::new(e))),
        }
    }

    async fn get_unit(
        &self,
        id: Uuid,
    ) -> Result<Option<RentableUnit>, Box<dyn std::error::Error + Send + Sync>> {
        let row = sqlx::query(&format!("SELECT {UNIT_COLUMNS} FROM units WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(unit_from_row).transpose()
    }

    async fn get_unit_by_name(
        &self,
        name: &str,
    ) -> Result<Option<RentableUnit>, Box<dyn std::error::Error + Send + Sync>> {
        let row = sqlx::query(&format!("SELECT {UNIT_COLUMNS} FROM units WHERE name = $1"))
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(unit_from_row).transpose()
    }

    async fn list_units(
        &self,
        include_inactive: bool,
    ) -> Result<Vec<RentableUnit>, Box<dyn std::error::Error + Send + Sync>> {
        let rows = if include_inactive {
            sqlx::query(&format!("SELECT {UNIT_COLUMNS} FROM units ORDER BY name"))
                .fetch_all(&self.pool)
                .await?
        } else {
            sqlx::query(&format!(
                "SELECT {UNIT_COLUMNS} FROM units WHERE active ORDER BY name"
            ))
            .fetch_all(&self.pool)
            .await?
        };

        rows.iter().map(unit_from_row).collect()
    }

    async fn update_unit(
        &self,
        unit: &RentableUnit,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let specs = serde_json::to_value(&unit.specs)?;
        let result = sqlx::query(
            r#"
            UPDATE units
            SET name = $1, daily_rate_cents = $2, remaining = $3, available = $4, active = $5,
                specs = $6, updated_at = NOW()
            WHERE id = $7
            "#,
        )
        .bind(&unit.name)
        .bind(unit.daily_rate_cents)
        .bind(unit.remaining)
        .bind(unit.available)
        .bind(unit.active)
        .bind(specs)
        .bind(unit.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(format!("unit not found: {}", unit.id).into());
        }
        Ok(())
    }

    async fn retire_unit(
        &self,
        id: Uuid,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let result =
            sqlx::query("UPDATE units SET active = FALSE, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(format!("unit not found: {id}").into());
        }
        Ok(())
    }

    async fn decrement(&self, request: &DecrementRequest) -> Result<(), InventoryError> {
        // The check and the subtraction run as ONE conditional update so two
        // concurrent bookings cannot both take the last unit. `remaining` on
        // the right-hand side refers to the pre-update value, which is what
        // keeps the availability flag in sync in the same statement.
        let result = sqlx::query(
            r#"
            UPDATE units
            SET remaining = remaining - $1, available = remaining - $1 > 0, updated_at = NOW()
            WHERE name = $2 AND active AND remaining >= $1
            "#,
        )
        .bind(request.amount())
        .bind(request.unit_name())
        .execute(&self.pool)
        .await
        .map_err(|e| InventoryError::Store(e.to_string()))?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        // Zero rows: the unit is unknown/retired, or the count was too low.
        let row = sqlx::query("SELECT remaining FROM units WHERE name = $1 AND active")
            .bind(request.unit_name())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| InventoryError::Store(e.to_string()))?;

        match row {
            None => Err(InventoryError::NotFound(request.unit_name().to_string())),
            Some(row) => {
                let available: i32 = row
                    .try_get("remaining")
                    .map_err(|e| InventoryError::Store(e.to_string()))?;
                Err(InventoryError::InsufficientInventory {
                    requested: request.amount(),
                    available,
                })
            }
        }
    }
}
