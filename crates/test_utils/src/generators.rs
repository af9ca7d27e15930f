//! Property-Based Test Generators
//!
//! Proptest strategies that respect domain invariants.

use core_kernel::{Currency, Money};
use domain_valuation::Fill;
use proptest::prelude::*;
use rust_decimal::Decimal;

/// Strategy for generating Currency values
pub fn currency_strategy() -> impl Strategy<Value = Currency> {
    prop_oneof![
        Just(Currency::USD),
        Just(Currency::EUR),
        Just(Currency::GBP),
        Just(Currency::PLN),
        Just(Currency::JPY),
        Just(Currency::CHF),
    ]
}

/// Strategy for positive amounts in minor units
pub fn positive_amount_minor_strategy() -> impl Strategy<Value = u64> {
    1u64..1_000_000_000u64
}

/// Strategy for positive Money values
pub fn positive_money_strategy() -> impl Strategy<Value = Money> {
    (positive_amount_minor_strategy(), currency_strategy())
        .prop_map(|(amount, currency)| Money::from_minor(amount, currency))
}

/// Strategy for positive USD prices
pub fn usd_price_strategy() -> impl Strategy<Value = Money> {
    (1u64..10_000_000u64).prop_map(|cents| Money::from_minor(cents, Currency::USD))
}

/// Strategy for positive quantities with up to four decimal places
pub fn quantity_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(|n| Decimal::new(n, 4))
}

/// Strategy for a single fill with a whole-unit quantity
pub fn fill_strategy() -> impl Strategy<Value = Fill> {
    (1u32..1_000u32, 1u32..1_000_000u32, 0u32..5_000u32).prop_map(|(q, p, f)| {
        Fill::new(
            Decimal::from(q),
            Decimal::new(p as i64, 2),
            Decimal::new(f as i64, 2),
        )
    })
}

/// Strategy for a list of fills
pub fn fills_strategy(max_len: usize) -> impl Strategy<Value = Vec<Fill>> {
    proptest::collection::vec(fill_strategy(), 0..max_len)
}
