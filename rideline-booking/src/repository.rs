use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{PaymentStatus, Registration};

/// Repository trait for registration documents.
#[async_trait]
pub trait RegistrationRepository: Send + Sync {
    async fn create(
        &self,
        registration: &Registration,
    ) -> Result<Uuid, Box<dyn std::error::Error + Send + Sync>>;

    async fn get(
        &self,
        id: Uuid,
    ) -> Result<Option<Registration>, Box<dyn std::error::Error + Send + Sync>>;

    async fn list_for_owner(
        &self,
        owner_id: &str,
    ) -> Result<Vec<Registration>, Box<dyn std::error::Error + Send + Sync>>;

    async fn list_by_status(
        &self,
        status: Option<PaymentStatus>,
    ) -> Result<Vec<Registration>, Box<dyn std::error::Error + Send + Sync>>;

    async fn set_session(
        &self,
        id: Uuid,
        session_id: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Conditionally transition the payment status, but only while the
    /// document is still `pending`. Returns whether the transition actually
    /// happened — `false` means the document was already settled (webhook
    /// replay) or does not exist. Implementations must execute the guard and
    /// the write as one atomic operation.
    async fn mark_status_if_pending(
        &self,
        id: Uuid,
        next: PaymentStatus,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;

    /// Compensating removal, used only when payment-session creation fails
    /// right after the document was written, so a failed submission leaves
    /// nothing behind.
    async fn delete(&self, id: Uuid) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Repository trait for the rider-profile autofill store. Everything here is
/// best-effort from the caller's perspective.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Merge the given fields into the rider's saved profile.
    async fn save_fields(
        &self,
        owner_id: &str,
        fields: &serde_json::Value,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn get_fields(
        &self,
        owner_id: &str,
    ) -> Result<Option<serde_json::Value>, Box<dyn std::error::Error + Send + Sync>>;
}
