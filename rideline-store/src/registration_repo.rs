use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use rideline_booking::models::{PaymentStatus, Registration};
use rideline_booking::repository::RegistrationRepository;

/// Registrations are stored as one jsonb document per submission, with the
/// mutable fields (payment status, session handle) mirrored into columns.
/// The columns are authoritative: the conditional status transition runs
/// against them, and reads overlay them onto the deserialized document.
pub struct StoreRegistrationRepository {
    pool: PgPool,
}

impl StoreRegistrationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn registration_from_row(
    row: &PgRow,
) -> Result<Registration, Box<dyn std::error::Error + Send + Sync>> {
    let document: serde_json::Value = row.try_get("document")?;
    let mut registration: Registration = serde_json::from_value(document)?;

    let status: String = row.try_get("payment_status")?;
    registration.payment.status = PaymentStatus::parse(&status)
        .ok_or_else(|| format!("unknown payment status in store: {status}"))?;
    registration.session_id = row.try_get("session_id")?;
    Ok(registration)
}

#[async_trait]
impl RegistrationRepository for StoreRegistrationRepository {
    async fn create(
        &self,
        registration: &Registration,
    ) -> Result<Uuid, Box<dyn std::error::Error + Send + Sync>> {
        let document = serde_json::to_value(registration)?;

        sqlx::query(
            r#"
            INSERT INTO registrations (id, owner_id, unit_name, payment_status, session_id, document, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(registration.id)
        .bind(registration.owner_id.as_str())
        .bind(registration.hired_unit())
        .bind(registration.payment.status.as_str())
        .bind(registration.session_id.as_deref())
        .bind(document)
        .bind(registration.created_at)
        .execute(&self.pool)
        .await?;

        Ok(registration.id)
    }

    async fn get(
        &self,
        id: Uuid,
    ) -> Result<Option<Registration>, Box<dyn std::error::Error + Send + Sync>> {
        let row = sqlx::query(
            "SELECT document, payment_status, session_id FROM registrations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(registration_from_row).transpose()
    }

    async fn list_for_owner(
        &self,
        owner_id: &str,
    ) -> Result<Vec<Registration>, Box<dyn std::error::Error + Send + Sync>> {
        let rows = sqlx::query(
            "SELECT document, payment_status, session_id FROM registrations \
             WHERE owner_id = $1 ORDER BY created_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(registration_from_row).collect()
    }

    async fn list_by_status(
        &self,
        status: Option<PaymentStatus>,
    ) -> Result<Vec<Registration>, Box<dyn std::error::Error + Send + Sync>> {
        let rows = if let Some(status) = status {
            sqlx::query(
                "SELECT document, payment_status, session_id FROM registrations \
                 WHERE payment_status = $1 ORDER BY created_at DESC",
            )
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query(
                "SELECT document, payment_status, session_id FROM registrations \
                 ORDER BY created_at DESC",
            )
            .fetch_all(&self.pool)
            .await?
        };

        rows.iter().map(registration_from_row).collect()
    }

    async fn set_session(
        &self,
        id: Uuid,
        session_id: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query(
            r#"
            UPDATE registrations
            SET session_id = $2, document = jsonb_set(document, '{session_id}', to_jsonb($2::text))
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(session_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_status_if_pending(
        &self,
        id: Uuid,
        next: PaymentStatus,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        if !PaymentStatus::Pending.can_transition(next) {
            return Err(format!("illegal transition pending -> {}", next.as_str()).into());
        }

        // Guard and write in one statement: replayed webhooks find the row
        // already settled and match nothing.
        let result = sqlx::query(
            r#"
            UPDATE registrations
            SET payment_status = $2,
                document = jsonb_set(document, '{payment,status}', to_jsonb($2::text))
            WHERE id = $1 AND payment_status = 'pending'
            "#,
        )
        .bind(id)
        .bind(next.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, id: Uuid) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query("DELETE FROM registrations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
