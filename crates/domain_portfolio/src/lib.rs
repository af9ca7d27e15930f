//! Portfolio Domain
//!
//! This crate implements the portfolio aggregate of the ledger. A portfolio
//! is a named, currency-denominated container owned by a single user; the
//! investments it holds live in their own aggregates and refer back to it.
//!
//! # Event Sourcing
//!
//! The aggregate's state is derived solely from its ordered event stream.
//! Command methods validate invariants and record exactly one event each;
//! [`Portfolio::apply`] is the only place state changes, and replaying the
//! stream from [`Portfolio::empty`] reproduces the same state.
//!
//! # Portfolio Lifecycle
//!
//! ```text
//! Active -> Closed (terminal)
//! ```
//!
//! # Example
//!
//! ```rust
//! use core_kernel::{Currency, OwnerId, PortfolioId, UserId};
//! use domain_portfolio::Portfolio;
//!
//! let mut portfolio = Portfolio::create(
//!     PortfolioId::new_v7(),
//!     OwnerId::new(),
//!     "Retirement",
//!     None,
//!     Currency::PLN,
//! )?;
//! portfolio.rename("Pension")?;
//! portfolio.close(Some("Moved to another broker".into()), UserId::new())?;
//! assert!(portfolio.is_closed());
//! assert_eq!(portfolio.take_events().len(), 3);
//! # Ok::<(), domain_portfolio::PortfolioError>(())
//! ```

pub mod aggregate;
pub mod events;
pub mod error;

pub use aggregate::{Portfolio, PortfolioStatus, MAX_NAME_LENGTH};
pub use events::PortfolioEvent;
pub use error::PortfolioError;
