//! Custom Test Assertions
//!
//! Assertion helpers for domain types that give more meaningful failure
//! messages than a bare `assert_eq!`.

use core_kernel::{Money, SignedMoney};
use rust_decimal::Decimal;

/// Asserts that two Money values are approximately equal within a tolerance
///
/// # Panics
///
/// Panics if the currencies differ or the amounts differ by more than tolerance
pub fn assert_money_approx_eq(actual: &Money, expected: &Money, tolerance: Decimal) {
    assert_eq!(
        actual.currency(),
        expected.currency(),
        "Currency mismatch: actual={}, expected={}",
        actual.currency(),
        expected.currency()
    );

    let diff = (actual.amount() - expected.amount()).abs();
    assert!(
        diff <= tolerance,
        "Money amounts differ by more than tolerance: actual={}, expected={}, diff={}, tolerance={}",
        actual.amount(),
        expected.amount(),
        diff,
        tolerance
    );
}

/// Asserts that two decimals are within `tolerance` of each other
pub fn assert_decimal_approx_eq(actual: Decimal, expected: Decimal, tolerance: Decimal) {
    let diff = (actual - expected).abs();
    assert!(
        diff <= tolerance,
        "Values differ by more than tolerance: actual={}, expected={}, diff={}",
        actual,
        expected,
        diff
    );
}

/// Asserts that a Money value is zero
pub fn assert_money_zero(money: &Money) {
    assert!(money.is_zero(), "Expected zero money, got {}", money);
}

/// Asserts that a profit/loss figure is a loss
pub fn assert_loss(pnl: &SignedMoney) {
    assert!(pnl.is_negative(), "Expected a loss, got {}", pnl);
}

/// Asserts that money values sum to a total
///
/// # Panics
///
/// Panics if the parts do not share the total's currency or do not add up
pub fn assert_money_sum(parts: &[Money], total: &Money) {
    let sum = parts
        .iter()
        .try_fold(Money::zero(total.currency()), |acc, part| acc.add(part))
        .expect("parts share the total's currency");
    assert_eq!(
        sum.amount(),
        total.amount(),
        "Parts sum to {} but total is {}",
        sum,
        total
    );
}
