//! Core Kernel - Foundational types for the portfolio ledger
//!
//! This crate provides the building blocks shared by every domain crate:
//! - Money types with precise decimal arithmetic
//! - Strongly-typed identifiers for aggregates and actors
//! - The event store port that aggregates are persisted through

pub mod money;
pub mod identifiers;
pub mod error;
pub mod ports;

pub use money::{Money, SignedMoney, Currency, Rate, MoneyError};
pub use identifiers::{PortfolioId, InvestmentId, OwnerId, UserId, TransactionId};
pub use error::CoreError;
pub use ports::{DomainEvent, DomainPort, EventEnvelope, EventStore, PortError};
