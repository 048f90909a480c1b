use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A checkout session created with the payment collaborator. The engine stores
/// only the session handle; card data never touches this system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String, // Provider's ID (e.g., cs_123)
    pub registration_id: Uuid,
    pub amount_cents: i64,
    pub currency: String,
    pub redirect_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a hosted checkout session with the provider. The provider later
    /// reports the outcome through a signed webhook.
    async fn create_session(
        &self,
        registration_id: Uuid,
        amount_cents: i64,
        currency: &str,
    ) -> Result<CheckoutSession, Box<dyn std::error::Error + Send + Sync>>;
}

/// Stand-in gateway for development and tests. The real integration is a
/// deployment concern; everything in this engine talks to the trait.
pub struct MockPaymentGateway;

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_session(
        &self,
        registration_id: Uuid,
        amount_cents: i64,
        currency: &str,
    ) -> Result<CheckoutSession, Box<dyn std::error::Error + Send + Sync>> {
        Ok(CheckoutSession {
            // Encode registration_id in the session id so the mock can "remember" it
            id: format!("mock_cs_{}", registration_id.simple()),
            registration_id,
            amount_cents,
            currency: currency.to_string(),
            redirect_url: Some(format!(
                "https://checkout.example.test/session/mock_cs_{}",
                registration_id.simple()
            )),
            created_at: Utc::now(),
        })
    }
}
