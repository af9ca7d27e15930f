//! Portfolio domain errors

use thiserror::Error;

/// Errors that can occur in the portfolio domain
///
/// Every variant is a business-rule rejection raised before any event is
/// recorded, so a failed command never leaves a partial state change.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PortfolioError {
    /// Name is missing or blank
    #[error("Portfolio name cannot be empty")]
    EmptyName,

    /// Name exceeds the allowed length
    #[error("Portfolio name cannot exceed {max} characters")]
    NameTooLong { max: usize },

    /// Rename to the current name
    #[error("Portfolio is already named '{0}'")]
    SameName(String),

    /// Mutation attempted on a closed portfolio
    #[error("Portfolio is closed and cannot be modified")]
    Closed,

    /// Close attempted on a closed portfolio
    #[error("Portfolio is already closed")]
    AlreadyClosed,

    /// Replay attempted over an empty stream
    #[error("Portfolio event stream is empty")]
    EmptyStream,

    /// Stream does not start with a creation event, or mixes portfolios
    #[error("Invalid portfolio event sequence: {0}")]
    InvalidEventSequence(String),
}

impl PortfolioError {
    /// Returns true if the portfolio's lifecycle state rejected the command
    pub fn is_state_violation(&self) -> bool {
        matches!(self, PortfolioError::Closed | PortfolioError::AlreadyClosed)
    }
}
