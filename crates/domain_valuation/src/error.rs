//! Valuation domain errors

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use core_kernel::MoneyError;

/// Errors that can occur in the valuation domain
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValuationError {
    #[error("Quantity cannot be negative: {0}")]
    NegativeQuantity(Decimal),

    #[error("Nominal value must be positive")]
    InvalidNominal,

    #[error("Maturity date {maturity} is not after issue date {issue}")]
    InvalidTerm { issue: NaiveDate, maturity: NaiveDate },

    #[error("Invalid interest schedule: {0}")]
    InvalidSchedule(String),

    #[error("{transaction_type} transaction is missing {field}")]
    MissingField {
        transaction_type: &'static str,
        field: &'static str,
    },

    #[error("Money error: {0}")]
    Money(#[from] MoneyError),
}

impl ValuationError {
    pub fn schedule(message: impl Into<String>) -> Self {
        ValuationError::InvalidSchedule(message.into())
    }
}
