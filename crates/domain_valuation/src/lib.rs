//! Valuation Domain
//!
//! Pure calculators layered on top of the ledger. Nothing here performs I/O
//! or touches the event store; every function is a deterministic mapping
//! from inputs to figures.
//!
//! # Key Concepts
//!
//! - **Cost basis**: FIFO lot relief over an ordered list of buys and sells
//! - **Bond valuation**: accrued interest, 19% tax withholding and the
//!   early-redemption fee for a retail treasury bond position
//! - **Pricing convention**: per-unit quotes versus quotes expressed as a
//!   percentage of nominal value
//! - **Summary**: a position summary over a raw transaction history
//!
//! # Example
//!
//! ```
//! use domain_valuation::{cost_basis, Fill};
//! use rust_decimal_macros::dec;
//!
//! let buys = [Fill::new(dec!(10), dec!(100), dec!(0))];
//! let sells = [Fill::new(dec!(4), dec!(120), dec!(0))];
//!
//! let result = cost_basis::calculate(&buys, &sells);
//! assert_eq!(result.remaining_quantity, dec!(6));
//! assert_eq!(result.realized_gains, dec!(80));
//! ```

pub mod bond;
pub mod cost_basis;
pub mod error;
pub mod pricing;
pub mod summary;
pub mod transaction;

pub use bond::{BondTerms, BondType, BondValuation, BondValuator, InterestPeriod, TreasuryBondDetails, BOND_TAX_RATE};
pub use cost_basis::{CostBasis, Fill};
pub use error::ValuationError;
pub use pricing::PricingConvention;
pub use summary::{summarize_transactions, PositionSummary};
pub use transaction::{Transaction, TransactionType};
