use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// One bookable item type in the fleet (a bike model) with a finite count of
/// available instances.
///
/// `specs` is an open attribute bag (engine size, seat height, luggage
/// options, whatever the operator wants to surface). Keys are not enumerated
/// anywhere; values are display strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RentableUnit {
    pub id: Uuid,
    pub name: String,
    pub daily_rate_cents: i64,
    pub remaining: i32,
    pub available: bool,
    pub active: bool,
    #[serde(default)]
    pub specs: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RentableUnit {
    pub fn new(name: impl Into<String>, daily_rate_cents: i64, remaining: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            daily_rate_cents,
            remaining,
            available: remaining > 0,
            active: true,
            specs: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Recompute the availability flag from the remaining count. Every code
    /// path that mutates `remaining` must call this before persisting.
    pub fn sync_availability(&mut self) {
        self.available = self.remaining > 0;
        self.updated_at = Utc::now();
    }

    /// Soft delete. Units are never removed from the store; the flag is
    /// flipped instead so historical registrations keep a valid reference.
    pub fn retire(&mut self) {
        self.active = false;
        self.updated_at = Utc::now();
    }

    /// A unit can be offered for hire only while it is active and has stock.
    pub fn is_bookable(&self) -> bool {
        self.active && self.remaining > 0
    }
}
