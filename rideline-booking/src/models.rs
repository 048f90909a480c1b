use chrono::{DateTime, NaiveDate, Utc};
use rideline_shared::pii::Masked;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pricing::Quote;

// ============================================================================
// Payment status state machine
// ============================================================================

/// Payment lifecycle of a registration. The transition table is explicit:
/// a status only ever leaves `Pending`, and only the webhook processor or an
/// admin override moves it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Cancelled,
}

impl PaymentStatus {
    pub fn can_transition(self, next: PaymentStatus) -> bool {
        matches!(
            (self, next),
            (PaymentStatus::Pending, PaymentStatus::Paid)
                | (PaymentStatus::Pending, PaymentStatus::Failed)
                | (PaymentStatus::Pending, PaymentStatus::Cancelled)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "paid" => Some(PaymentStatus::Paid),
            "failed" => Some(PaymentStatus::Failed),
            "cancelled" => Some(PaymentStatus::Cancelled),
            _ => None,
        }
    }
}

// ============================================================================
// Form snapshots
// ============================================================================

// These structs are both the submission payload and the frozen snapshot
// embedded in the persisted document. Insurance requires an immutable record
// of what was declared at booking time, so the document copies values rather
// than referencing the rider profile.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonalDetails {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Masked<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub address: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyContact {
    pub name: String,
    pub relationship: String,
    pub phone: Masked<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalInfo {
    pub conditions: Masked<String>,
    pub medications: Masked<String>,
    pub allergies: Masked<String>,
    pub dietary_requirements: Option<String>,
    pub fit_to_ride: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RidingExperience {
    pub years_riding: i32,
    pub licence_type: String,
    pub licence_number: Masked<String>,
    /// Durable URL returned by the object storage collaborator.
    pub licence_photo_url: Option<String>,
    pub off_road_level: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logistics {
    pub arrival_date: NaiveDate,
    pub departure_date: NaiveDate,
    pub accommodation: Option<String>,
    pub has_partner: bool,
    pub partner_name: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BikeChoice {
    Hire,
    Own,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BikeSelection {
    pub choice: BikeChoice,
    /// Required when hiring: name of the fleet unit.
    pub unit_name: Option<String>,
    pub number_of_days: Option<i32>,
    /// Add-on names resolved against the configured rate table.
    #[serde(default)]
    pub add_ons: Vec<String>,
    /// Required when riding an own bike.
    pub bike_make: Option<String>,
    pub bike_model: Option<String>,
    pub bike_year: Option<i32>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentOption {
    Full,
    Deposit,
}

/// Terminal review step fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewStep {
    pub terms_agreed: bool,
    pub payment_option: Option<PaymentOption>,
    #[serde(default)]
    pub gift_voucher_cents: i64,
}

/// The composite payload a client accumulates across the form steps
/// (Intro → PersonalDetails → EmergencyContacts → MedicalInfo → Experience →
/// Logistics → BikeDetails → ReviewAndPay) and submits once at the end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationPayload {
    pub personal: PersonalDetails,
    pub emergency_contacts: Vec<EmergencyContact>,
    pub medical: MedicalInfo,
    pub experience: RidingExperience,
    pub logistics: Logistics,
    pub bike: BikeSelection,
    pub review: ReviewStep,
}

// ============================================================================
// Persisted document
// ============================================================================

/// The server-computed charge attached to a registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub subtotal_cents: i64,
    pub base_amount_cents: i64,
    pub voucher_applied_cents: i64,
    pub merchant_fee_cents: i64,
    pub total_cents: i64,
    pub option: PaymentOption,
    pub currency: String,
    pub status: PaymentStatus,
}

impl PaymentRecord {
    pub fn from_quote(quote: &Quote, currency: impl Into<String>) -> Self {
        Self {
            subtotal_cents: quote.subtotal_cents,
            base_amount_cents: quote.base_amount_cents,
            voucher_applied_cents: quote.voucher_applied_cents,
            merchant_fee_cents: quote.merchant_fee_cents,
            total_cents: quote.total_cents,
            option: quote.option,
            currency: currency.into(),
            status: PaymentStatus::Pending,
        }
    }
}

/// One immutable document per successful terminal submission. Snapshots never
/// change after creation; only `payment.status` and `session_id` are mutated,
/// through their dedicated repository operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub id: Uuid,
    pub owner_id: String,
    pub personal: PersonalDetails,
    pub emergency_contacts: Vec<EmergencyContact>,
    pub medical: MedicalInfo,
    pub experience: RidingExperience,
    pub logistics: Logistics,
    pub bike: BikeSelection,
    pub payment: PaymentRecord,
    pub session_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Registration {
    pub fn new(owner_id: impl Into<String>, payload: RegistrationPayload, payment: PaymentRecord) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.into(),
            personal: payload.personal,
            emergency_contacts: payload.emergency_contacts,
            medical: payload.medical,
            experience: payload.experience,
            logistics: payload.logistics,
            bike: payload.bike,
            payment,
            session_id: None,
            created_at: Utc::now(),
        }
    }

    /// Hired unit name, when this booking consumes fleet inventory.
    pub fn hired_unit(&self) -> Option<&str> {
        match self.bike.choice {
            BikeChoice::Hire => self.bike.unit_name.as_deref(),
            BikeChoice::Own => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_table_only_leaves_pending() {
        use PaymentStatus::*;

        assert!(Pending.can_transition(Paid));
        assert!(Pending.can_transition(Failed));
        assert!(Pending.can_transition(Cancelled));

        for from in [Paid, Failed, Cancelled] {
            for to in [Pending, Paid, Failed, Cancelled] {
                assert!(!from.can_transition(to), "{from:?} -> {to:?} must be rejected");
            }
        }
        assert!(!Pending.can_transition(Pending));
    }

    #[test]
    fn status_round_trips_through_storage_strings() {
        for status in [
            PaymentStatus::Pending,
            PaymentStatus::Paid,
            PaymentStatus::Failed,
            PaymentStatus::Cancelled,
        ] {
            assert_eq!(PaymentStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(PaymentStatus::parse("refunded"), None);
    }

    #[test]
    fn own_bike_registrations_reference_no_unit() {
        let payload = crate::validation::tests::valid_payload();
        let mut own = payload.clone();
        own.bike = BikeSelection {
            choice: BikeChoice::Own,
            unit_name: None,
            number_of_days: None,
            add_ons: vec![],
            bike_make: Some("KTM".to_string()),
            bike_model: Some("890 Adventure".to_string()),
            bike_year: Some(2023),
        };

        let quote = crate::pricing::Quote {
            subtotal_cents: 119000,
            base_amount_cents: 49900,
            voucher_applied_cents: 0,
            merchant_fee_cents: 1497,
            total_cents: 51397,
            option: PaymentOption::Deposit,
        };
        let registration =
            Registration::new("rider-1", own, PaymentRecord::from_quote(&quote, "AUD"));
        assert!(registration.hired_unit().is_none());

        let hired = Registration::new(
            "rider-1",
            payload,
            PaymentRecord::from_quote(&quote, "AUD"),
        );
        assert_eq!(hired.hired_unit(), Some("Tenere 700"));
    }
}
