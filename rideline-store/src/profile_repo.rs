use async_trait::async_trait;
use sqlx::{PgPool, Row};

use rideline_booking::repository::ProfileRepository;

/// Rider autofill profiles: one jsonb bag of last-seen form fields per
/// rider. Saves merge rather than replace, so a step that only carries
/// licence details does not wipe the address saved earlier.
pub struct StoreProfileRepository {
    pool: PgPool,
}

impl StoreProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileRepository for StoreProfileRepository {
    async fn save_fields(
        &self,
        owner_id: &str,
        fields: &serde_json::Value,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query(
            r#"
            INSERT INTO rider_profiles (owner_id, fields, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (owner_id)
            DO UPDATE SET fields = rider_profiles.fields || EXCLUDED.fields, updated_at = NOW()
            "#,
        )
        .bind(owner_id)
        .bind(fields)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_fields(
        &self,
        owner_id: &str,
    ) -> Result<Option<serde_json::Value>, Box<dyn std::error::Error + Send + Sync>> {
        let row = sqlx::query("SELECT fields FROM rider_profiles WHERE owner_id = $1")
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(row.try_get("fields")?)),
            None => Ok(None),
        }
    }
}
