use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::PaymentOption;

/// Operator fee schedule, loaded from configuration. All amounts are integer
/// cents; the merchant fee rate is basis points so the computation stays in
/// integer arithmetic and the client can re-derive the same numbers exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub base_fee_cents: i64,
    pub partner_fee_cents: i64,
    pub deposit_cents: i64,
    pub merchant_fee_bps: i64,
    pub add_on_rates: BTreeMap<String, i64>,
}

/// Hire-specific charges resolved against the authoritative unit record.
#[derive(Debug, Clone)]
pub struct HireCharges {
    pub daily_rate_cents: i64,
    pub number_of_days: i64,
    pub add_on_daily_rates: Vec<i64>,
}

/// The server-side charge breakdown. This is the authoritative figure — the
/// client runs the same computation for display, but the amount sent to the
/// payment collaborator always comes from here, never from the payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Quote {
    pub subtotal_cents: i64,
    pub base_amount_cents: i64,
    pub voucher_applied_cents: i64,
    pub merchant_fee_cents: i64,
    pub total_cents: i64,
    pub option: PaymentOption,
}

/// Merchant surcharge, rounded half-up to the cent.
pub fn merchant_fee_cents(base_cents: i64, bps: i64) -> i64 {
    (base_cents * bps + 5_000) / 10_000
}

pub fn build_quote(
    fees: &FeeSchedule,
    has_partner: bool,
    hire: Option<&HireCharges>,
    option: PaymentOption,
    voucher_cents: i64,
) -> Quote {
    let mut subtotal_cents = fees.base_fee_cents;
    if has_partner {
        subtotal_cents += fees.partner_fee_cents;
    }
    if let Some(hire) = hire {
        subtotal_cents += hire.daily_rate_cents * hire.number_of_days;
        subtotal_cents += hire
            .add_on_daily_rates
            .iter()
            .map(|rate| rate * hire.number_of_days)
            .sum::<i64>();
    }

    let base_before_voucher = match option {
        PaymentOption::Full => subtotal_cents,
        PaymentOption::Deposit => fees.deposit_cents,
    };

    // A voucher can at most zero the charge, never push it negative.
    let voucher_applied_cents = voucher_cents.clamp(0, base_before_voucher);
    let base_amount_cents = base_before_voucher - voucher_applied_cents;
    let fee = merchant_fee_cents(base_amount_cents, fees.merchant_fee_bps);

    Quote {
        subtotal_cents,
        base_amount_cents,
        voucher_applied_cents,
        merchant_fee_cents: fee,
        total_cents: base_amount_cents + fee,
        option,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule() -> FeeSchedule {
        let mut add_on_rates = BTreeMap::new();
        add_on_rates.insert("panniers".to_string(), 1_500);
        add_on_rates.insert("gps".to_string(), 1_000);
        FeeSchedule {
            base_fee_cents: 119_000,
            partner_fee_cents: 89_000,
            deposit_cents: 49_900,
            merchant_fee_bps: 300,
            add_on_rates,
        }
    }

    #[test]
    fn deposit_with_no_extras_matches_the_published_example() {
        // Base fee $1190, deposit $499, 3% surcharge: 499 + 14.97 = 513.97.
        let quote = build_quote(&schedule(), false, None, PaymentOption::Deposit, 0);
        assert_eq!(quote.subtotal_cents, 119_000);
        assert_eq!(quote.base_amount_cents, 49_900);
        assert_eq!(quote.merchant_fee_cents, 1_497);
        assert_eq!(quote.total_cents, 51_397);
    }

    #[test]
    fn full_payment_sums_partner_hire_and_add_ons() {
        let hire = HireCharges {
            daily_rate_cents: 18_500,
            number_of_days: 7,
            add_on_daily_rates: vec![1_500, 1_000],
        };
        let quote = build_quote(&schedule(), true, Some(&hire), PaymentOption::Full, 0);

        // 119000 + 89000 + 18500*7 + (1500+1000)*7
        assert_eq!(quote.subtotal_cents, 119_000 + 89_000 + 129_500 + 17_500);
        assert_eq!(quote.base_amount_cents, quote.subtotal_cents);
        assert_eq!(
            quote.total_cents,
            quote.base_amount_cents + quote.merchant_fee_cents
        );
    }

    #[test]
    fn voucher_reduces_the_base_before_the_fee() {
        let quote = build_quote(&schedule(), false, None, PaymentOption::Deposit, 10_000);
        assert_eq!(quote.voucher_applied_cents, 10_000);
        assert_eq!(quote.base_amount_cents, 39_900);
        assert_eq!(quote.merchant_fee_cents, 1_197);
        assert_eq!(quote.total_cents, 41_097);
    }

    #[test]
    fn oversized_voucher_floors_the_charge_at_zero() {
        let quote = build_quote(&schedule(), false, None, PaymentOption::Deposit, 1_000_000);
        assert_eq!(quote.voucher_applied_cents, 49_900);
        assert_eq!(quote.base_amount_cents, 0);
        assert_eq!(quote.merchant_fee_cents, 0);
        assert_eq!(quote.total_cents, 0);
    }

    #[test]
    fn negative_voucher_values_are_ignored() {
        let quote = build_quote(&schedule(), false, None, PaymentOption::Deposit, -500);
        assert_eq!(quote.voucher_applied_cents, 0);
        assert_eq!(quote.base_amount_cents, 49_900);
    }

    #[test]
    fn merchant_fee_rounds_half_up() {
        // 150 * 3% = 4.5 cents -> 5
        assert_eq!(merchant_fee_cents(150, 300), 5);
        // 100 * 3% = 3 cents exactly
        assert_eq!(merchant_fee_cents(100, 300), 3);
        // 10 * 3% = 0.3 cents -> 0
        assert_eq!(merchant_fee_cents(10, 300), 0);
    }
}
