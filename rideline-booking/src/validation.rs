use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::models::{BikeChoice, RegistrationPayload};

/// Field-level validation failures, keyed by the payload path the client can
/// attach the message to.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationErrors {
    fields: BTreeMap<String, String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields.entry(field.into()).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} field(s) failed validation", self.fields.len())
    }
}

impl std::error::Error for ValidationErrors {}

fn required(errors: &mut ValidationErrors, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.add(field, "required");
    }
}

// Each step checks only its own fields; the terminal submission runs every
// step plus the cross-field rules in validate_review.

pub fn validate_personal(payload: &RegistrationPayload, errors: &mut ValidationErrors) {
    let personal = &payload.personal;
    required(errors, "personal.first_name", &personal.first_name);
    required(errors, "personal.last_name", &personal.last_name);
    required(errors, "personal.phone", &personal.phone.0);
    if personal.email.trim().is_empty() {
        errors.add("personal.email", "required");
    } else if !personal.email.contains('@') {
        errors.add("personal.email", "must be a valid email address");
    }
}

pub fn validate_emergency_contacts(payload: &RegistrationPayload, errors: &mut ValidationErrors) {
    if payload.emergency_contacts.is_empty() {
        errors.add("emergency_contacts", "at least one emergency contact is required");
        return;
    }
    for (i, contact) in payload.emergency_contacts.iter().enumerate() {
        required(errors, &format!("emergency_contacts[{i}].name"), &contact.name);
        required(
            errors,
            &format!("emergency_contacts[{i}].relationship"),
            &contact.relationship,
        );
        required(errors, &format!("emergency_contacts[{i}].phone"), &contact.phone.0);
    }
}

pub fn validate_medical(payload: &RegistrationPayload, errors: &mut ValidationErrors) {
    if !payload.medical.fit_to_ride {
        errors.add("medical.fit_to_ride", "fitness to ride must be declared");
    }
}

pub fn validate_experience(payload: &RegistrationPayload, errors: &mut ValidationErrors) {
    let experience = &payload.experience;
    if experience.years_riding < 0 {
        errors.add("experience.years_riding", "cannot be negative");
    }
    required(errors, "experience.licence_type", &experience.licence_type);
    required(errors, "experience.licence_number", &experience.licence_number.0);
}

pub fn validate_logistics(payload: &RegistrationPayload, errors: &mut ValidationErrors) {
    let logistics = &payload.logistics;
    if logistics.departure_date < logistics.arrival_date {
        errors.add("logistics.departure_date", "departure cannot precede arrival");
    }
    if logistics.has_partner {
        match &logistics.partner_name {
            Some(name) if !name.trim().is_empty() => {}
            _ => errors.add("logistics.partner_name", "required when bringing a partner"),
        }
    }
}

pub fn validate_bike(
    payload: &RegistrationPayload,
    known_add_ons: &BTreeMap<String, i64>,
    errors: &mut ValidationErrors,
) {
    let bike = &payload.bike;
    match bike.choice {
        BikeChoice::Hire => {
            match &bike.unit_name {
                Some(name) if !name.trim().is_empty() => {}
                _ => errors.add("bike.unit_name", "choose a bike to hire"),
            }
            match bike.number_of_days {
                Some(days) if days >= 1 => {}
                Some(_) => errors.add("bike.number_of_days", "must be at least 1"),
                None => errors.add("bike.number_of_days", "required when hiring"),
            }
            for add_on in &bike.add_ons {
                if !known_add_ons.contains_key(add_on) {
                    errors.add(format!("bike.add_ons.{add_on}"), "unknown add-on");
                }
            }
        }
        BikeChoice::Own => {
            if bike.bike_make.as_deref().map_or(true, |s| s.trim().is_empty()) {
                errors.add("bike.bike_make", "required when riding your own bike");
            }
            if bike.bike_model.as_deref().map_or(true, |s| s.trim().is_empty()) {
                errors.add("bike.bike_model", "required when riding your own bike");
            }
            if bike.bike_year.is_none() {
                errors.add("bike.bike_year", "required when riding your own bike");
            }
        }
    }
}

pub fn validate_review(payload: &RegistrationPayload, errors: &mut ValidationErrors) {
    let review = &payload.review;
    if !review.terms_agreed {
        errors.add("review.terms_agreed", "terms and conditions must be accepted");
    }
    if review.payment_option.is_none() {
        errors.add("review.payment_option", "choose full payment or deposit");
    }
    if review.gift_voucher_cents < 0 {
        errors.add("review.gift_voucher_cents", "cannot be negative");
    }
}

/// Terminal validation: every step plus the cross-field rules. The workflow
/// refuses to touch the store unless this returns Ok.
pub fn validate_submission(
    payload: &RegistrationPayload,
    known_add_ons: &BTreeMap<String, i64>,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    validate_personal(payload, &mut errors);
    validate_emergency_contacts(payload, &mut errors);
    validate_medical(payload, &mut errors);
    validate_experience(payload, &mut errors);
    validate_logistics(payload, &mut errors);
    validate_bike(payload, known_add_ons, &mut errors);
    validate_review(payload, &mut errors);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
