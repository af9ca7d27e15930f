//! Domain events for the portfolio aggregate
//!
//! Domain events are the source of truth for a portfolio. They are used for:
//! - Rebuilding aggregate state by replay
//! - Driving the read-model projections
//! - Downstream integrations that consume the committed log

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{Currency, DomainEvent, OwnerId, PortfolioId, UserId};

/// Domain events emitted by the Portfolio aggregate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortfolioEvent {
    /// Portfolio has been created
    PortfolioCreated {
        portfolio_id: PortfolioId,
        owner_id: OwnerId,
        name: String,
        description: Option<String>,
        currency: Currency,
        timestamp: DateTime<Utc>,
    },

    /// Portfolio has been renamed
    PortfolioRenamed {
        portfolio_id: PortfolioId,
        old_name: String,
        new_name: String,
        timestamp: DateTime<Utc>,
    },

    /// Name and description replaced together
    PortfolioDetailsUpdated {
        portfolio_id: PortfolioId,
        name: String,
        description: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// Portfolio has been closed
    PortfolioClosed {
        portfolio_id: PortfolioId,
        reason: Option<String>,
        closed_by: UserId,
        timestamp: DateTime<Utc>,
    },
}

impl PortfolioEvent {
    /// Returns the portfolio ID associated with this event
    pub fn portfolio_id(&self) -> PortfolioId {
        match self {
            PortfolioEvent::PortfolioCreated { portfolio_id, .. } => *portfolio_id,
            PortfolioEvent::PortfolioRenamed { portfolio_id, .. } => *portfolio_id,
            PortfolioEvent::PortfolioDetailsUpdated { portfolio_id, .. } => *portfolio_id,
            PortfolioEvent::PortfolioClosed { portfolio_id, .. } => *portfolio_id,
        }
    }

    /// Returns the timestamp of this event
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            PortfolioEvent::PortfolioCreated { timestamp, .. } => *timestamp,
            PortfolioEvent::PortfolioRenamed { timestamp, .. } => *timestamp,
            PortfolioEvent::PortfolioDetailsUpdated { timestamp, .. } => *timestamp,
            PortfolioEvent::PortfolioClosed { timestamp, .. } => *timestamp,
        }
    }
}

impl DomainEvent for PortfolioEvent {
    const STREAM_CATEGORY: &'static str = "portfolio";

    fn event_type(&self) -> &'static str {
        match self {
            PortfolioEvent::PortfolioCreated { .. } => "PortfolioCreated",
            PortfolioEvent::PortfolioRenamed { .. } => "PortfolioRenamed",
            PortfolioEvent::PortfolioDetailsUpdated { .. } => "PortfolioDetailsUpdated",
            PortfolioEvent::PortfolioClosed { .. } => "PortfolioClosed",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.timestamp()
    }
}
