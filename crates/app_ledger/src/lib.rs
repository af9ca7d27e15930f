//! Ledger Application Layer
//!
//! Wires the aggregates to the event stores and exposes the two sides of
//! the ledger:
//!
//! - **Commands** ([`PortfolioCommands`], [`InvestmentCommands`]): load a
//!   stream, replay it into the aggregate, check for cancellation, decide,
//!   and append under the loaded version. The read models are up to date
//!   when a command returns.
//! - **Queries** ([`LedgerQueries`]): read-model lookups and the pure
//!   valuation calculators.
//!
//! Commands never retry. A [`LedgerError::ConcurrencyConflict`] reports that
//! another writer got there first; callers may reload and try again, which
//! [`LedgerError::is_retryable`] signals.

pub mod commands;
pub mod config;
pub mod error;
pub mod ledger;
pub mod queries;

pub use commands::{
    AddInvestment, ClosePortfolio, CreatePortfolio, InvestmentCommands, PortfolioCommands,
    RenamePortfolio, SellInvestment, UpdateInvestmentValue, UpdatePortfolioDetails,
};
pub use config::{LedgerConfig, StoreBackend};
pub use error::LedgerError;
pub use ledger::{Ledger, ReplayCounts, StreamFailure, StreamReport};
pub use queries::LedgerQueries;
