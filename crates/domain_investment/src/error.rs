//! Investment domain errors

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use core_kernel::MoneyError;

/// Errors that can occur in the investment domain
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvestmentError {
    /// Quantity must be strictly positive
    #[error("Quantity must be greater than zero, got {0}")]
    InvalidQuantity(Decimal),

    /// Price must be strictly positive
    #[error("Price must be greater than zero")]
    InvalidPrice,

    /// Date lies after the current time
    #[error("Date {0} is in the future")]
    FutureDate(DateTime<Utc>),

    /// The position has been fully sold
    #[error("Investment has been sold and cannot be modified")]
    AlreadySold,

    /// Price currency differs from the purchase currency
    #[error("Currency mismatch: expected {expected}, got {actual}")]
    CurrencyMismatch {
        expected: String,
        actual: String,
    },

    /// Sale exceeds the quantity still held
    #[error("Cannot sell {requested} units, only {available} held")]
    InsufficientQuantity {
        requested: Decimal,
        available: Decimal,
    },

    /// Ticker or exchange failed validation
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    /// Underlying money arithmetic failed
    #[error("Money error: {0}")]
    Money(#[from] MoneyError),

    /// Replay attempted over an empty stream
    #[error("Investment event stream is empty")]
    EmptyStream,

    /// Stream does not start with a creation event, or mixes investments
    #[error("Invalid investment event sequence: {0}")]
    InvalidEventSequence(String),
}

impl InvestmentError {
    pub fn currency_mismatch(expected: impl ToString, actual: impl ToString) -> Self {
        InvestmentError::CurrencyMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}
