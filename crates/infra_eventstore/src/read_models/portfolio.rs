//! Portfolio read model

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use core_kernel::{Currency, EventEnvelope, OwnerId, PortfolioId, UserId};
use domain_portfolio::{PortfolioEvent, PortfolioStatus};

use super::{read, write, Page, Paged, Sequencer};
use crate::projection::Projection;

/// Denormalized portfolio row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioReadModel {
    pub portfolio_id: PortfolioId,
    pub owner_id: OwnerId,
    pub name: String,
    pub description: Option<String>,
    pub currency: Currency,
    pub status: PortfolioStatus,
    pub close_reason: Option<String>,
    pub closed_at: Option<DateTime<Utc>>,
    pub closed_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Last stream version absorbed
    pub version: u64,
}

impl PortfolioReadModel {
    pub fn is_closed(&self) -> bool {
        self.status == PortfolioStatus::Closed
    }
}

#[derive(Debug, Default)]
struct Rows {
    by_id: HashMap<PortfolioId, PortfolioReadModel>,
    sequencer: Sequencer<PortfolioEvent>,
}

/// Keeps one [`PortfolioReadModel`] per portfolio stream
#[derive(Debug, Default)]
pub struct PortfolioProjection {
    rows: RwLock<Rows>,
}

impl PortfolioProjection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn get(&self, id: PortfolioId) -> Option<PortfolioReadModel> {
        read(&self.rows).by_id.get(&id).cloned()
    }

    /// Portfolios of one owner, oldest first
    pub fn list_by_owner(
        &self,
        owner_id: OwnerId,
        include_closed: bool,
        page: Page,
    ) -> Paged<PortfolioReadModel> {
        let mut rows: Vec<PortfolioReadModel> = read(&self.rows)
            .by_id
            .values()
            .filter(|row| row.owner_id == owner_id)
            .filter(|row| include_closed || !row.is_closed())
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then(a.portfolio_id.cmp(&b.portfolio_id))
        });
        page.slice(rows)
    }

    pub fn len(&self) -> usize {
        read(&self.rows).by_id.len()
    }

    /// Envelopes held back until an earlier version arrives
    pub fn pending(&self) -> usize {
        read(&self.rows).sequencer.held()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Projection<PortfolioEvent> for PortfolioProjection {
    fn name(&self) -> &'static str {
        "portfolio"
    }

    fn apply(&self, envelope: &EventEnvelope<PortfolioEvent>) -> bool {
        let mut rows = write(&self.rows);
        let Rows { by_id, sequencer } = &mut *rows;
        let applied = by_id
            .get(&envelope.payload.portfolio_id())
            .map_or(0, |row| row.version);

        let ready = sequencer.ready(applied, envelope);
        for envelope in &ready {
            absorb(by_id, envelope);
        }
        !ready.is_empty()
    }

    fn reset(&self) {
        let mut rows = write(&self.rows);
        rows.by_id.clear();
        rows.sequencer.clear();
    }
}

fn absorb(
    rows: &mut HashMap<PortfolioId, PortfolioReadModel>,
    envelope: &EventEnvelope<PortfolioEvent>,
) {
    let event = &envelope.payload;
    let id = event.portfolio_id();

    if let PortfolioEvent::PortfolioCreated {
        owner_id,
        name,
        description,
        currency,
        timestamp,
        ..
    } = event
    {
        if rows.contains_key(&id) {
            return;
        }
        rows.insert(
            id,
            PortfolioReadModel {
                portfolio_id: id,
                owner_id: *owner_id,
                name: name.clone(),
                description: description.clone(),
                currency: *currency,
                status: PortfolioStatus::Active,
                close_reason: None,
                closed_at: None,
                closed_by: None,
                created_at: *timestamp,
                updated_at: *timestamp,
                version: envelope.version,
            },
        );
        return;
    }

    let Some(row) = rows.get_mut(&id) else {
        debug!(portfolio_id = %id, "Skipping event for unknown portfolio");
        return;
    };

    match event {
        PortfolioEvent::PortfolioCreated { .. } => {}
        PortfolioEvent::PortfolioRenamed {
            new_name, timestamp, ..
        } => {
            row.name = new_name.clone();
            row.updated_at = *timestamp;
        }
        PortfolioEvent::PortfolioDetailsUpdated {
            name,
            description,
            timestamp,
            ..
        } => {
            row.name = name.clone();
            row.description = description.clone();
            row.updated_at = *timestamp;
        }
        PortfolioEvent::PortfolioClosed {
            reason,
            closed_by,
            timestamp,
            ..
        } => {
            row.status = PortfolioStatus::Closed;
            row.close_reason = reason.clone();
            row.closed_by = Some(*closed_by);
            row.closed_at = Some(*timestamp);
            row.updated_at = *timestamp;
        }
    }
    row.version = envelope.version;
}
