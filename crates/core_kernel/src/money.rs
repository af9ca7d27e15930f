//! Money types with precise decimal arithmetic
//!
//! This module provides a type-safe representation of monetary values
//! using rust_decimal for precise calculations without floating-point errors.
//!
//! Two value types are provided:
//! - [`Money`]: a non-negative amount (prices, costs, market values)
//! - [`SignedMoney`]: an amount that may be negative (profit and loss)
//!
//! Amounts are kept at full decimal precision; rounding to the currency's
//! minor unit is an explicit operation.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::error::CoreError;

/// Currency codes following ISO 4217
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    USD,
    EUR,
    GBP,
    PLN,
    JPY,
    CHF,
    CAD,
    AUD,
    SEK,
    NOK,
}

impl Currency {
    /// Returns the number of decimal places for this currency
    pub fn decimal_places(&self) -> u32 {
        match self {
            Currency::JPY => 0,
            _ => 2,
        }
    }

    /// Returns the currency symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::USD => "$",
            Currency::EUR => "€",
            Currency::GBP => "£",
            Currency::PLN => "zł",
            Currency::JPY => "¥",
            Currency::CHF => "CHF",
            Currency::CAD => "C$",
            Currency::AUD => "A$",
            Currency::SEK => "kr",
            Currency::NOK => "kr",
        }
    }

    /// Returns the ISO 4217 code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::PLN => "PLN",
            Currency::JPY => "JPY",
            Currency::CHF => "CHF",
            Currency::CAD => "CAD",
            Currency::AUD => "AUD",
            Currency::SEK => "SEK",
            Currency::NOK => "NOK",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Currency {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Currency::USD),
            "EUR" => Ok(Currency::EUR),
            "GBP" => Ok(Currency::GBP),
            "PLN" => Ok(Currency::PLN),
            "JPY" => Ok(Currency::JPY),
            "CHF" => Ok(Currency::CHF),
            "CAD" => Ok(Currency::CAD),
            "AUD" => Ok(Currency::AUD),
            "SEK" => Ok(Currency::SEK),
            "NOK" => Ok(Currency::NOK),
            other => Err(CoreError::validation(format!("Unknown currency code: {}", other))),
        }
    }
}

/// Errors that can occur during money operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Currency mismatch: cannot operate on {0} and {1}")]
    CurrencyMismatch(String, String),

    #[error("Amount cannot be negative: {0}")]
    NegativeAmount(Decimal),

    #[error("Factor cannot be negative: {0}")]
    NegativeFactor(Decimal),

    #[error("Division by zero")]
    DivisionByZero,
}

impl MoneyError {
    fn mismatch(left: Currency, right: Currency) -> Self {
        MoneyError::CurrencyMismatch(left.to_string(), right.to_string())
    }
}

/// A non-negative monetary amount with associated currency
///
/// Every operation returns a new value; a `Money` is never mutated in place.
/// Operations that would produce a negative amount fail with
/// [`MoneyError::NegativeAmount`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawMoney", into = "RawMoney")]
pub struct Money {
    amount: Decimal,
    currency: Currency,
}

/// Wire shape of [`Money`], validated on deserialization
#[derive(Serialize, Deserialize)]
struct RawMoney {
    amount: Decimal,
    currency: Currency,
}

impl TryFrom<RawMoney> for Money {
    type Error = MoneyError;

    fn try_from(raw: RawMoney) -> Result<Self, Self::Error> {
        Money::new(raw.amount, raw.currency)
    }
}

impl From<Money> for RawMoney {
    fn from(money: Money) -> Self {
        RawMoney {
            amount: money.amount,
            currency: money.currency,
        }
    }
}

impl Money {
    /// Creates a new Money value
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::NegativeAmount`] if `amount` is below zero
    pub fn new(amount: Decimal, currency: Currency) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MoneyError::NegativeAmount(amount));
        }
        Ok(Self {
            amount: amount.normalize(),
            currency,
        })
    }

    /// Creates Money from an amount in minor units (e.g., cents)
    pub fn from_minor(minor_units: u64, currency: Currency) -> Self {
        let divisor = Decimal::new(10_i64.pow(currency.decimal_places()), 0);
        Self {
            amount: (Decimal::from(minor_units) / divisor).normalize(),
            currency,
        }
    }

    /// Creates a zero amount in the specified currency
    pub fn zero(currency: Currency) -> Self {
        Self {
            amount: Decimal::ZERO,
            currency,
        }
    }

    /// Returns the amount
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// Returns the currency
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Returns true if the amount is zero
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Returns true if the amount is strictly positive
    pub fn is_positive(&self) -> bool {
        !self.amount.is_zero()
    }

    /// Returns true if both values share a currency
    pub fn same_currency(&self, other: &Money) -> bool {
        self.currency == other.currency
    }

    /// Adds two amounts of the same currency
    pub fn add(&self, other: &Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::mismatch(self.currency, other.currency));
        }
        Money::new(self.amount + other.amount, self.currency)
    }

    /// Subtracts `other`, failing on currency mismatch or a negative result
    pub fn subtract(&self, other: &Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::mismatch(self.currency, other.currency));
        }
        Money::new(self.amount - other.amount, self.currency)
    }

    /// Multiplies by a non-negative scalar (quantities, rates)
    pub fn multiply(&self, factor: Decimal) -> Result<Money, MoneyError> {
        if factor.is_sign_negative() && !factor.is_zero() {
            return Err(MoneyError::NegativeFactor(factor));
        }
        Money::new(self.amount * factor, self.currency)
    }

    /// Divides by a positive scalar
    pub fn divide(&self, divisor: Decimal) -> Result<Money, MoneyError> {
        if divisor.is_zero() {
            return Err(MoneyError::DivisionByZero);
        }
        if divisor.is_sign_negative() {
            return Err(MoneyError::NegativeFactor(divisor));
        }
        Money::new(self.amount / divisor, self.currency)
    }

    /// Signed difference `self - other`, which may be negative
    pub fn difference(&self, other: &Money) -> Result<SignedMoney, MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::mismatch(self.currency, other.currency));
        }
        Ok(SignedMoney::new(self.amount - other.amount, self.currency))
    }

    /// Rounds to the currency's standard decimal places
    pub fn round_to_currency(&self) -> Self {
        Self {
            amount: self.amount.round_dp(self.currency.decimal_places()),
            currency: self.currency,
        }
    }

    /// Converts into a signed amount
    pub fn to_signed(&self) -> SignedMoney {
        SignedMoney::new(self.amount, self.currency)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dp = self.currency.decimal_places();
        write!(
            f,
            "{} {:.dp$}",
            self.currency.symbol(),
            self.amount,
            dp = dp as usize
        )
    }
}

/// A monetary amount that may be negative
///
/// Realized and unrealized profit/loss are the typical uses: a losing
/// sale produces a negative amount that a [`Money`] cannot represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignedMoney {
    amount: Decimal,
    currency: Currency,
}

impl SignedMoney {
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Self {
            amount: amount.normalize(),
            currency,
        }
    }

    pub fn zero(currency: Currency) -> Self {
        Self::new(Decimal::ZERO, currency)
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn is_negative(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }

    pub fn add(&self, other: &SignedMoney) -> Result<SignedMoney, MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::mismatch(self.currency, other.currency));
        }
        Ok(Self::new(self.amount + other.amount, self.currency))
    }

    pub fn subtract(&self, other: &SignedMoney) -> Result<SignedMoney, MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::mismatch(self.currency, other.currency));
        }
        Ok(Self::new(self.amount - other.amount, self.currency))
    }

    /// Multiplies by any scalar; the sign of the result follows the factor
    pub fn multiply(&self, factor: Decimal) -> SignedMoney {
        Self::new(self.amount * factor, self.currency)
    }

    /// Returns this amount as a fraction of `base`, in percent
    ///
    /// Returns zero when `base` is zero.
    pub fn percent_of(&self, base: &Money) -> Result<Decimal, MoneyError> {
        if self.currency != base.currency() {
            return Err(MoneyError::mismatch(self.currency, base.currency()));
        }
        if base.is_zero() {
            return Ok(Decimal::ZERO);
        }
        Ok(self.amount / base.amount() * dec!(100))
    }
}

impl From<Money> for SignedMoney {
    fn from(money: Money) -> Self {
        money.to_signed()
    }
}

impl fmt::Display for SignedMoney {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dp = self.currency.decimal_places();
        let sign = if self.is_negative() { "-" } else { "" };
        write!(
            f,
            "{}{} {:.dp$}",
            sign,
            self.currency.symbol(),
            self.amount.abs(),
            dp = dp as usize
        )
    }
}

/// Represents a percentage rate (e.g., interest rate, tax rate)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rate {
    /// The rate as a decimal (e.g., 0.05 for 5%)
    value: Decimal,
}

impl Rate {
    /// Creates a rate from a decimal value (e.g., 0.05 for 5%)
    pub fn new(value: Decimal) -> Self {
        Self { value }
    }

    /// Creates a rate from a percentage (e.g., 5.0 for 5%)
    pub fn from_percentage(percentage: Decimal) -> Self {
        Self {
            value: percentage / dec!(100),
        }
    }

    /// Returns the rate as a decimal
    pub fn as_decimal(&self) -> Decimal {
        self.value
    }

    /// Returns the rate as a percentage
    pub fn as_percentage(&self) -> Decimal {
        self.value * dec!(100)
    }

    /// Applies this rate to a plain decimal amount
    pub fn apply(&self, amount: Decimal) -> Decimal {
        amount * self.value
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.as_percentage().round_dp(4))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_creation() {
        let m = Money::new(dec!(100.50), Currency::USD).unwrap();
        assert_eq!(m.amount(), dec!(100.50));
        assert_eq!(m.currency(), Currency::USD);
    }

    #[test]
    fn test_negative_amount_rejected() {
        let result = Money::new(dec!(-0.01), Currency::USD);
        assert_eq!(result, Err(MoneyError::NegativeAmount(dec!(-0.01))));
    }

    #[test]
    fn test_money_arithmetic() {
        let a = Money::new(dec!(100.00), Currency::USD).unwrap();
        let b = Money::new(dec!(50.00), Currency::USD).unwrap();

        assert_eq!(a.add(&b).unwrap().amount(), dec!(150));
        assert_eq!(a.subtract(&b).unwrap().amount(), dec!(50));
        assert!(matches!(b.subtract(&a), Err(MoneyError::NegativeAmount(_))));
    }

    #[test]
    fn test_currency_mismatch() {
        let usd = Money::new(dec!(100.00), Currency::USD).unwrap();
        let eur = Money::new(dec!(100.00), Currency::EUR).unwrap();

        let result = usd.add(&eur);
        assert!(matches!(result, Err(MoneyError::CurrencyMismatch(_, _))));
    }

    #[test]
    fn test_negative_factor_rejected() {
        let m = Money::new(dec!(10), Currency::PLN).unwrap();
        assert_eq!(m.multiply(dec!(-2)), Err(MoneyError::NegativeFactor(dec!(-2))));
        assert_eq!(m.multiply(dec!(0)).unwrap(), Money::zero(Currency::PLN));
    }

    #[test]
    fn test_signed_difference() {
        let sale = Money::new(dec!(90), Currency::USD).unwrap();
        let cost = Money::new(dec!(100), Currency::USD).unwrap();

        let pnl = sale.difference(&cost).unwrap();
        assert!(pnl.is_negative());
        assert_eq!(pnl.amount(), dec!(-10));
        assert_eq!(pnl.to_string(), "-$ 10.00");
    }

    #[test]
    fn test_rate_application() {
        let rate = Rate::from_percentage(dec!(19));
        assert_eq!(rate.apply(dec!(6.80)), dec!(1.292));
    }

    #[test]
    fn test_deserialization_rejects_negative() {
        let json = r#"{"amount":"-5","currency":"USD"}"#;
        assert!(serde_json::from_str::<Money>(json).is_err());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn money_never_negative_after_operations(
            a in 0u64..1_000_000_000u64,
            b in 0u64..1_000_000_000u64,
            factor in 0u32..10_000u32
        ) {
            let ma = Money::from_minor(a, Currency::USD);
            let mb = Money::from_minor(b, Currency::USD);

            if let Ok(diff) = ma.subtract(&mb) {
                prop_assert!(!diff.amount().is_sign_negative() || diff.is_zero());
            }
            let scaled = ma.multiply(Decimal::new(factor as i64, 2)).unwrap();
            prop_assert!(scaled.amount() >= Decimal::ZERO);
        }

        #[test]
        fn money_addition_is_associative(
            a in 0u64..1_000_000u64,
            b in 0u64..1_000_000u64,
            c in 0u64..1_000_000u64
        ) {
            let ma = Money::from_minor(a, Currency::USD);
            let mb = Money::from_minor(b, Currency::USD);
            let mc = Money::from_minor(c, Currency::USD);

            let left = ma.add(&mb).unwrap().add(&mc).unwrap();
            let right = ma.add(&mb.add(&mc).unwrap()).unwrap();
            prop_assert_eq!(left, right);
        }
    }
}
