//! Domain events for the investment aggregate
//!
//! Events carry the values derived at decision time (new current value,
//! realized P/L of the sale, cost basis released) so that replay and the
//! projections never recompute money arithmetic.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{DomainEvent, InvestmentId, Money, PortfolioId, SignedMoney};

use crate::symbol::Symbol;

/// Domain events emitted by the Investment aggregate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvestmentEvent {
    /// A position has been opened
    InvestmentAdded {
        investment_id: InvestmentId,
        portfolio_id: PortfolioId,
        symbol: Symbol,
        purchase_price: Money,
        quantity: Decimal,
        purchase_date: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    },

    /// The position has been revalued at a new per-unit price
    InvestmentValueUpdated {
        investment_id: InvestmentId,
        portfolio_id: PortfolioId,
        old_price: Money,
        new_price: Money,
        old_value: Money,
        new_value: Money,
        timestamp: DateTime<Utc>,
    },

    /// Part or all of the position has been sold
    InvestmentSold {
        investment_id: InvestmentId,
        portfolio_id: PortfolioId,
        sale_price: Money,
        quantity_sold: Decimal,
        remaining_quantity: Decimal,
        is_complete_sale: bool,
        /// Realized P/L of this sale alone
        realized_profit_loss: SignedMoney,
        /// Purchase cost of the units sold
        cost_basis_sold: Money,
        /// Value of the remaining units after the sale
        value_after_sale: Money,
        sale_date: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    },
}

impl InvestmentEvent {
    /// Returns the investment ID associated with this event
    pub fn investment_id(&self) -> InvestmentId {
        match self {
            InvestmentEvent::InvestmentAdded { investment_id, .. } => *investment_id,
            InvestmentEvent::InvestmentValueUpdated { investment_id, .. } => *investment_id,
            InvestmentEvent::InvestmentSold { investment_id, .. } => *investment_id,
        }
    }

    /// Returns the owning portfolio
    pub fn portfolio_id(&self) -> PortfolioId {
        match self {
            InvestmentEvent::InvestmentAdded { portfolio_id, .. } => *portfolio_id,
            InvestmentEvent::InvestmentValueUpdated { portfolio_id, .. } => *portfolio_id,
            InvestmentEvent::InvestmentSold { portfolio_id, .. } => *portfolio_id,
        }
    }

    /// Returns the timestamp of this event
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            InvestmentEvent::InvestmentAdded { timestamp, .. } => *timestamp,
            InvestmentEvent::InvestmentValueUpdated { timestamp, .. } => *timestamp,
            InvestmentEvent::InvestmentSold { timestamp, .. } => *timestamp,
        }
    }
}

impl DomainEvent for InvestmentEvent {
    const STREAM_CATEGORY: &'static str = "investment";

    fn event_type(&self) -> &'static str {
        match self {
            InvestmentEvent::InvestmentAdded { .. } => "InvestmentAdded",
            InvestmentEvent::InvestmentValueUpdated { .. } => "InvestmentValueUpdated",
            InvestmentEvent::InvestmentSold { .. } => "InvestmentSold",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.timestamp()
    }
}
