use std::sync::Arc;
use uuid::Uuid;

use rideline_core::collaborators::Mailer;
use rideline_core::payment::{CheckoutSession, PaymentGateway};
use rideline_fleet::UnitRepository;

use crate::models::{
    BikeChoice, PaymentOption, PaymentRecord, Registration, RegistrationPayload,
};
use crate::pricing::{self, FeeSchedule, HireCharges, Quote};
use crate::repository::{ProfileRepository, RegistrationRepository};
use crate::validation::{self, ValidationErrors};

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("unit not found: {0}")]
    UnitNotFound(String),

    #[error("payment session could not be created: {0}")]
    PaymentSession(String),

    #[error("store failure: {0}")]
    Store(String),
}

#[derive(Debug)]
pub struct SubmissionOutcome {
    pub registration_id: Uuid,
    pub quote: Quote,
    pub session: CheckoutSession,
}

/// Orchestrates the terminal submission of the multi-step registration form:
/// validate, price, persist one immutable document, open a checkout session.
///
/// Inventory is NOT touched here. A unit's count reflects paid bookings only,
/// so the decrement happens in the webhook processor once the payment
/// collaborator confirms the charge. Abandoned checkouts therefore never
/// starve the fleet.
pub struct RegistrationWorkflow {
    units: Arc<dyn UnitRepository>,
    registrations: Arc<dyn RegistrationRepository>,
    profiles: Arc<dyn ProfileRepository>,
    gateway: Arc<dyn PaymentGateway>,
    mailer: Arc<dyn Mailer>,
    fees: FeeSchedule,
    currency: String,
}

impl RegistrationWorkflow {
    pub fn new(
        units: Arc<dyn UnitRepository>,
        registrations: Arc<dyn RegistrationRepository>,
        profiles: Arc<dyn ProfileRepository>,
        gateway: Arc<dyn PaymentGateway>,
        mailer: Arc<dyn Mailer>,
        fees: FeeSchedule,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            units,
            registrations,
            profiles,
            gateway,
            mailer,
            fees,
            currency: currency.into(),
        }
    }

    pub fn fees(&self) -> &FeeSchedule {
        &self.fees
    }

    pub async fn submit(
        &self,
        payload: RegistrationPayload,
        owner_id: &str,
    ) -> Result<SubmissionOutcome, WorkflowError> {
        // 1. Validate. Nothing is persisted past this point unless the whole
        // payload is acceptable.
        validation::validate_submission(&payload, &self.fees.add_on_rates)?;

        // 2. Resolve the hired unit for its authoritative daily rate. The
        // client's idea of the price is display-only.
        let hire = match payload.bike.choice {
            BikeChoice::Hire => {
                let name = payload.bike.unit_name.as_deref().unwrap_or_default();
                let unit = self
                    .units
                    .get_unit_by_name(name)
                    .await
                    .map_err(|e| WorkflowError::Store(e.to_string()))?
                    .filter(|u| u.active)
                    .ok_or_else(|| WorkflowError::UnitNotFound(name.to_string()))?;

                let number_of_days = i64::from(payload.bike.number_of_days.unwrap_or(1));
                let add_on_daily_rates = payload
                    .bike
                    .add_ons
                    .iter()
                    .filter_map(|name| self.fees.add_on_rates.get(name).copied())
                    .collect();
                Some(HireCharges {
                    daily_rate_cents: unit.daily_rate_cents,
                    number_of_days,
                    add_on_daily_rates,
                })
            }
            BikeChoice::Own => None,
        };

        // 3. Server-side quote.
        let option = payload
            .review
            .payment_option
            .unwrap_or(PaymentOption::Deposit);
        let quote = pricing::build_quote(
            &self.fees,
            payload.logistics.has_partner,
            hire.as_ref(),
            option,
            payload.review.gift_voucher_cents,
        );

        // 4. Freeze the document with payment pending.
        let email = payload.personal.email.clone();
        let autofill = autofill_fields(&payload);
        let record = PaymentRecord::from_quote(&quote, &self.currency);
        let registration = Registration::new(owner_id, payload, record);
        let registration_id = registration.id;

        // 5. Persist exactly one document.
        self.registrations
            .create(&registration)
            .await
            .map_err(|e| WorkflowError::Store(e.to_string()))?;

        // 6. Open the checkout session. If the collaborator fails, compensate
        // the write so the failed submission leaves nothing behind.
        let session = match self
            .gateway
            .create_session(registration_id, quote.total_cents, &self.currency)
            .await
        {
            Ok(session) => session,
            Err(e) => {
                if let Err(del) = self.registrations.delete(registration_id).await {
                    tracing::error!(
                        registration_id = %registration_id,
                        error = %del,
                        "registration left behind after session failure; manual cleanup required"
                    );
                }
                return Err(WorkflowError::PaymentSession(e.to_string()));
            }
        };

        if let Err(e) = self
            .registrations
            .set_session(registration_id, &session.id)
            .await
        {
            tracing::error!(
                registration_id = %registration_id,
                session_id = %session.id,
                error = %e,
                "session handle not recorded against registration"
            );
        }

        // 7. Best-effort side effects. Neither may fail the submission.
        self.autosave(owner_id, &autofill).await;
        if let Err(e) = self
            .mailer
            .send(
                &email,
                "registration-received",
                &serde_json::json!({
                    "registration_id": registration_id,
                    "total_cents": quote.total_cents,
                    "currency": self.currency,
                }),
            )
            .await
        {
            tracing::warn!(registration_id = %registration_id, error = %e, "confirmation email not sent");
        }

        Ok(SubmissionOutcome {
            registration_id,
            quote,
            session,
        })
    }

    /// Best-effort profile auto-save, also invoked as the client advances
    /// through form steps. Failures are logged and swallowed.
    pub async fn autosave(&self, owner_id: &str, fields: &serde_json::Value) {
        if let Err(e) = self.profiles.save_fields(owner_id, fields).await {
            tracing::warn!(owner_id, error = %e, "profile auto-save failed");
        }
    }
}

/// Fields worth remembering for autofill on future forms. Deliberately
/// excludes medical declarations.
fn autofill_fields(payload: &RegistrationPayload) -> serde_json::Value {
    serde_json::json!({
        "first_name": payload.personal.first_name,
        "last_name": payload.personal.last_name,
        "email": payload.personal.email,
        "phone": payload.personal.phone,
        "address": payload.personal.address,
        "country": payload.personal.country,
        "licence_type": payload.experience.licence_type,
        "licence_number": payload.experience.licence_number,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryProfileRepository, MemoryRegistrationRepository};
    use crate::models::PaymentStatus;
    use crate::validation::tests::{known_add_ons, valid_payload};
    use async_trait::async_trait;
    use rideline_core::collaborators::LogMailer;
    use rideline_core::payment::MockPaymentGateway;
    use rideline_fleet::memory::MemoryUnitRepository;
    use rideline_fleet::RentableUnit;

    struct FailingGateway;

    #[async_trait]
    impl PaymentGateway for FailingGateway {
        async fn create_session(
            &self,
            _registration_id: Uuid,
            _amount_cents: i64,
            _currency: &str,
        ) -> Result<CheckoutSession, Box<dyn std::error::Error + Send + Sync>> {
            Err("gateway unreachable".into())
        }
    }

    struct FailingProfileRepository;

    #[async_trait]
    impl ProfileRepository for FailingProfileRepository {
        async fn save_fields(
            &self,
            _owner_id: &str,
            _fields: &serde_json::Value,
        ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            Err("profile store down".into())
        }

        async fn get_fields(
            &self,
            _owner_id: &str,
        ) -> Result<Option<serde_json::Value>, Box<dyn std::error::Error + Send + Sync>> {
            Err("profile store down".into())
        }
    }

    fn fee_schedule() -> FeeSchedule {
        FeeSchedule {
            base_fee_cents: 119_000,
            partner_fee_cents: 89_000,
            deposit_cents: 49_900,
            merchant_fee_bps: 300,
            add_on_rates: known_add_ons(),
        }
    }

    struct Harness {
        units: Arc<MemoryUnitRepository>,
        registrations: Arc<MemoryRegistrationRepository>,
        workflow: RegistrationWorkflow,
    }

    fn harness_with(
        gateway: Arc<dyn PaymentGateway>,
        profiles: Arc<dyn ProfileRepository>,
    ) -> Harness {
        let units = Arc::new(MemoryUnitRepository::with_units(vec![RentableUnit::new(
            "Tenere 700",
            18_500,
            2,
        )]));
        let registrations = Arc::new(MemoryRegistrationRepository::new());
        let workflow = RegistrationWorkflow::new(
            units.clone(),
            registrations.clone(),
            profiles,
            gateway,
            Arc::new(LogMailer),
            fee_schedule(),
            "AUD",
        );
        Harness {
            units,
            registrations,
            workflow,
        }
    }

    fn harness() -> Harness {
        harness_with(
            Arc::new(MockPaymentGateway),
            Arc::new(MemoryProfileRepository::new()),
        )
    }

    #[tokio::test]
    async fn successful_submission_creates_one_pending_document() {
        let h = harness();
        let outcome = h.workflow.submit(valid_payload(), "rider-1").await.unwrap();

        assert_eq!(h.registrations.count(), 1);
        let stored = h
            .registrations
            .get(outcome.registration_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.payment.status, PaymentStatus::Pending);
        assert_eq!(stored.session_id.as_deref(), Some(outcome.session.id.as_str()));
        assert_eq!(stored.owner_id, "rider-1");

        // Deposit option: base 499.00, fee 14.97, total 513.97.
        assert_eq!(outcome.quote.base_amount_cents, 49_900);
        assert_eq!(outcome.quote.total_cents, 51_397);
        // Subtotal still reflects the whole trip: 1190 + 185*7 + 15*7.
        assert_eq!(outcome.quote.subtotal_cents, 119_000 + 129_500 + 10_500);
    }

    #[tokio::test]
    async fn submission_does_not_touch_inventory() {
        let h = harness();
        h.workflow.submit(valid_payload(), "rider-1").await.unwrap();

        let unit = h.units.get_unit_by_name("Tenere 700").await.unwrap().unwrap();
        assert_eq!(unit.remaining, 2, "decrement must wait for payment confirmation");
    }

    #[tokio::test]
    async fn validation_failure_persists_nothing() {
        let h = harness();
        let mut payload = valid_payload();
        payload.review.terms_agreed = false;

        let err = h.workflow.submit(payload, "rider-1").await.unwrap_err();
        match err {
            WorkflowError::Validation(errors) => assert!(errors.contains("review.terms_agreed")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(h.registrations.count(), 0);
    }

    #[tokio::test]
    async fn unknown_unit_is_rejected_before_persistence() {
        let h = harness();
        let mut payload = valid_payload();
        payload.bike.unit_name = Some("Goldwing".to_string());

        let err = h.workflow.submit(payload, "rider-1").await.unwrap_err();
        assert!(matches!(err, WorkflowError::UnitNotFound(_)));
        assert_eq!(h.registrations.count(), 0);
    }

    #[tokio::test]
    async fn session_failure_leaves_no_document_behind() {
        let h = harness_with(
            Arc::new(FailingGateway),
            Arc::new(MemoryProfileRepository::new()),
        );
        let err = h.workflow.submit(valid_payload(), "rider-1").await.unwrap_err();
        assert!(matches!(err, WorkflowError::PaymentSession(_)));
        assert_eq!(h.registrations.count(), 0);
    }

    #[tokio::test]
    async fn profile_store_failure_does_not_fail_the_submission() {
        let h = harness_with(
            Arc::new(MockPaymentGateway),
            Arc::new(FailingProfileRepository),
        );
        let outcome = h.workflow.submit(valid_payload(), "rider-1").await;
        assert!(outcome.is_ok());
        assert_eq!(h.registrations.count(), 1);
    }

    #[tokio::test]
    async fn own_bike_submission_skips_unit_resolution() {
        let h = harness();
        let mut payload = valid_payload();
        payload.bike = crate::models::BikeSelection {
            choice: BikeChoice::Own,
            unit_name: None,
            number_of_days: None,
            add_ons: vec![],
            bike_make: Some("KTM".to_string()),
            bike_model: Some("890 Adventure".to_string()),
            bike_year: Some(2023),
        };

        let outcome = h.workflow.submit(payload, "rider-1").await.unwrap();
        // No hire charges: subtotal is the base fee alone.
        assert_eq!(outcome.quote.subtotal_cents, 119_000);
    }
}
