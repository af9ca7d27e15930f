//! Investment Domain
//!
//! This crate implements the investment aggregate: a single position in one
//! instrument, bought once at a (blended) per-unit purchase price and then
//! revalued and sold, possibly in several partial sales.
//!
//! # Investment Lifecycle
//!
//! ```text
//! Active -> PartiallySold -> PartiallySold -> ... -> Sold (terminal)
//!       \---------------------------------------->/
//! ```
//!
//! # Realized Profit and Loss
//!
//! [`Investment::sell`] books realized P/L against the single blended
//! purchase price of the aggregate. Positions assembled from discrete buy
//! lots are valued with the FIFO calculator in `domain_valuation` instead;
//! the two are deliberately separate operations.

pub mod aggregate;
pub mod symbol;
pub mod events;
pub mod error;

pub use aggregate::{Investment, InvestmentStatus};
pub use symbol::{AssetType, Symbol, MAX_TICKER_LENGTH};
pub use events::InvestmentEvent;
pub use error::InvestmentError;
