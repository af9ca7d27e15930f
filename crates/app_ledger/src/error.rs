//! Application errors

use thiserror::Error;
use uuid::Uuid;

use core_kernel::{Currency, MoneyError, PortError, PortfolioId};
use domain_investment::{AssetType, InvestmentError};
use domain_portfolio::PortfolioError;
use domain_valuation::{PricingConvention, ValuationError};

/// Errors returned by command handlers and queries
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Portfolio error: {0}")]
    Portfolio(#[from] PortfolioError),

    #[error("Investment error: {0}")]
    Investment(#[from] InvestmentError),

    #[error("Valuation error: {0}")]
    Valuation(#[from] ValuationError),

    #[error("Money error: {0}")]
    Money(#[from] MoneyError),

    #[error("{entity} {id} not found")]
    NotFound { entity: String, id: String },

    #[error("Portfolio {0} is closed")]
    PortfolioClosed(PortfolioId),

    #[error("Investment priced in {investment} cannot join a {portfolio} portfolio")]
    CurrencyMismatch {
        portfolio: Currency,
        investment: Currency,
    },

    /// Bonds must be quoted as a percent of nominal, other assets per unit
    #[error("{pricing:?} does not fit {asset_type:?} quotes")]
    PricingMismatch {
        asset_type: AssetType,
        pricing: PricingConvention,
    },

    /// Another writer appended to the stream first
    #[error("Concurrency conflict on stream {stream_id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        stream_id: Uuid,
        expected: u64,
        actual: u64,
    },

    #[error("Command cancelled")]
    Cancelled,

    #[error("Store error: {0}")]
    Store(PortError),
}

impl LedgerError {
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        LedgerError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// True when reloading and re-issuing the command may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            LedgerError::ConcurrencyConflict { .. } => true,
            LedgerError::Store(error) => error.is_transient(),
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, LedgerError::NotFound { .. })
    }
}

impl From<PortError> for LedgerError {
    fn from(error: PortError) -> Self {
        match error {
            PortError::ConcurrencyConflict {
                stream_id,
                expected,
                actual,
            } => LedgerError::ConcurrencyConflict {
                stream_id,
                expected,
                actual,
            },
            PortError::NotFound { entity_type, id } => LedgerError::NotFound {
                entity: entity_type,
                id,
            },
            other => LedgerError::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_is_retryable() {
        let error = LedgerError::from(PortError::conflict(Uuid::new_v4(), 1, 2));
        assert!(error.is_retryable());
    }

    #[test]
    fn test_domain_errors_are_not_retryable() {
        assert!(!LedgerError::from(PortfolioError::AlreadyClosed).is_retryable());
        assert!(!LedgerError::Cancelled.is_retryable());
    }

    #[test]
    fn test_transient_store_error_is_retryable() {
        assert!(LedgerError::from(PortError::connection("reset")).is_retryable());
        assert!(!LedgerError::from(PortError::internal("bug")).is_retryable());
    }
}
