use crate::unit::RentableUnit;

/// A validated request to consume stock from a unit. Construction enforces
/// the `amount >= 1` contract so no caller can ask for a zero or negative
/// decrement.
#[derive(Debug, Clone)]
pub struct DecrementRequest {
    unit_name: String,
    amount: i32,
}

impl DecrementRequest {
    pub fn new(unit_name: impl Into<String>, amount: i32) -> Result<Self, InventoryError> {
        if amount < 1 {
            return Err(InventoryError::InvalidAmount(amount));
        }
        Ok(Self {
            unit_name: unit_name.into(),
            amount,
        })
    }

    /// The common case: one confirmed booking consumes one unit.
    pub fn one(unit_name: impl Into<String>) -> Self {
        Self {
            unit_name: unit_name.into(),
            amount: 1,
        }
    }

    pub fn unit_name(&self) -> &str {
        &self.unit_name
    }

    pub fn amount(&self) -> i32 {
        self.amount
    }
}

/// Check-and-subtract against a single unit record.
///
/// The persisted variant of this rule must run as one atomic conditional
/// update (see the store crate); this function applies the identical rule to
/// an in-memory record and is what the in-memory repository uses under its
/// lock.
pub fn apply(unit: &mut RentableUnit, amount: i32) -> Result<(), InventoryError> {
    if unit.remaining < amount {
        return Err(InventoryError::InsufficientInventory {
            requested: amount,
            available: unit.remaining,
        });
    }
    unit.remaining -= amount;
    unit.sync_availability();
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("decrement amount must be at least 1, got {0}")]
    InvalidAmount(i32),

    #[error("unit not found: {0}")]
    NotFound(String),

    #[error("insufficient inventory: requested {requested}, available {available}")]
    InsufficientInventory { requested: i32, available: i32 },

    #[error("inventory store failure: {0}")]
    Store(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_rejects_non_positive_amounts() {
        assert!(DecrementRequest::new("Tenere 700", 0).is_err());
        assert!(DecrementRequest::new("Tenere 700", -2).is_err());
        assert!(DecrementRequest::new("Tenere 700", 1).is_ok());
    }

    #[test]
    fn apply_consumes_stock_and_syncs_availability() {
        let mut unit = RentableUnit::new("Tenere 700", 18500, 2);
        apply(&mut unit, 1).unwrap();
        assert_eq!(unit.remaining, 1);
        assert!(unit.available);

        apply(&mut unit, 1).unwrap();
        assert_eq!(unit.remaining, 0);
        assert!(!unit.available);
    }

    #[test]
    fn last_unit_cannot_be_taken_twice() {
        let mut unit = RentableUnit::new("DR650", 14000, 1);
        apply(&mut unit, 1).unwrap();

        let err = apply(&mut unit, 1).unwrap_err();
        match err {
            InventoryError::InsufficientInventory {
                requested,
                available,
            } => {
                assert_eq!(requested, 1);
                assert_eq!(available, 0);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(unit.remaining, 0);
    }

    #[test]
    fn zero_remaining_never_silently_succeeds() {
        let mut unit = RentableUnit::new("Himalayan", 11000, 0);
        assert!(matches!(
            apply(&mut unit, 1),
            Err(InventoryError::InsufficientInventory { .. })
        ));
        assert_eq!(unit.remaining, 0);
    }
}
