//! Investment read model

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use core_kernel::{EventEnvelope, InvestmentId, Money, PortfolioId, SignedMoney};
use domain_investment::{AssetType, InvestmentEvent, InvestmentStatus};

use super::{read, write, Page, Paged, Sequencer};
use crate::projection::Projection;

/// Denormalized investment row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvestmentReadModel {
    pub investment_id: InvestmentId,
    pub portfolio_id: PortfolioId,
    pub ticker: String,
    pub exchange: String,
    pub asset_type: AssetType,
    pub purchase_price: Money,
    pub current_price: Money,
    pub quantity: Decimal,
    pub original_quantity: Decimal,
    pub status: InvestmentStatus,
    pub current_value: Money,
    pub realized_profit_loss: SignedMoney,
    pub purchase_date: DateTime<Utc>,
    pub sold_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Last stream version absorbed
    pub version: u64,
}

#[derive(Debug, Default)]
struct Rows {
    by_id: HashMap<InvestmentId, InvestmentReadModel>,
    sequencer: Sequencer<InvestmentEvent>,
}

/// Keeps one [`InvestmentReadModel`] per investment stream
#[derive(Debug, Default)]
pub struct InvestmentProjection {
    rows: RwLock<Rows>,
}

impl InvestmentProjection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn get(&self, id: InvestmentId) -> Option<InvestmentReadModel> {
        read(&self.rows).by_id.get(&id).cloned()
    }

    pub fn list_by_portfolio(&self, portfolio_id: PortfolioId, page: Page) -> Paged<InvestmentReadModel> {
        self.list_where(page, |row| row.portfolio_id == portfolio_id)
    }

    pub fn list_by_status(&self, status: InvestmentStatus, page: Page) -> Paged<InvestmentReadModel> {
        self.list_where(page, |row| row.status == status)
    }

    pub fn list_by_asset_type(&self, asset_type: AssetType, page: Page) -> Paged<InvestmentReadModel> {
        self.list_where(page, |row| row.asset_type == asset_type)
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

    fn list_where<F>(&self, page: Page, predicate: F) -> Paged<InvestmentReadModel>
    where
        F: Fn(&InvestmentReadModel) -> bool,
    {
        let mut rows: Vec<InvestmentReadModel> = read(&self.rows)
            .by_id
            .values()
            .filter(|row| predicate(row))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            a.purchase_date
                .cmp(&b.purchase_date)
                .then(a.investment_id.cmp(&b.investment_id))
        });
        page.slice(rows)
    }
}

impl Projection<InvestmentEvent> for InvestmentProjection {
    fn name(&self) -> &'static str {
        "investment"
    }

    fn apply(&self, envelope: &EventEnvelope<InvestmentEvent>) -> bool {
        let mut rows = write(&self.rows);
        let Rows { by_id, sequencer } = &mut *rows;
        let applied = by_id
            .get(&envelope.payload.investment_id())
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
    rows: &mut HashMap<InvestmentId, InvestmentReadModel>,
    envelope: &EventEnvelope<InvestmentEvent>,
) {
    let event = &envelope.payload;
    let id = event.investment_id();

    if let InvestmentEvent::InvestmentAdded {
        portfolio_id,
        symbol,
        purchase_price,
        quantity,
        purchase_date,
        timestamp,
        ..
    } = event
    {
        if rows.contains_key(&id) {
            return;
        }
        let currency = purchase_price.currency();
        rows.insert(
            id,
            InvestmentReadModel {
                investment_id: id,
                portfolio_id: *portfolio_id,
                ticker: symbol.ticker().to_string(),
                exchange: symbol.exchange().to_string(),
                asset_type: symbol.asset_type(),
                purchase_price: *purchase_price,
                current_price: *purchase_price,
                quantity: *quantity,
                original_quantity: *quantity,
                status: InvestmentStatus::Active,
                current_value: purchase_price
                    .multiply(*quantity)
                    .unwrap_or_else(|_| Money::zero(currency)),
                realized_profit_loss: SignedMoney::zero(currency),
                purchase_date: *purchase_date,
                sold_date: None,
                created_at: *timestamp,
                updated_at: *timestamp,
                version: envelope.version,
            },
        );
        return;
    }

    let Some(row) = rows.get_mut(&id) else {
        debug!(investment_id = %id, "Skipping event for unknown investment");
        return;
    };

    match event {
        InvestmentEvent::InvestmentAdded { .. } => {}
        InvestmentEvent::InvestmentValueUpdated {
            new_price,
            new_value,
            timestamp,
            ..
        } => {
            row.current_price = *new_price;
            row.current_value = *new_value;
            row.updated_at = *timestamp;
        }
        InvestmentEvent::InvestmentSold {
            remaining_quantity,
            is_complete_sale,
            realized_profit_loss,
            value_after_sale,
            sale_date,
            timestamp,
            ..
        } => {
            row.quantity = *remaining_quantity;
            row.status = if *is_complete_sale {
                InvestmentStatus::Sold
            } else {
                InvestmentStatus::PartiallySold
            };
            row.current_value = *value_after_sale;
            row.realized_profit_loss = SignedMoney::new(
                row.realized_profit_loss.amount() + realized_profit_loss.amount(),
                row.realized_profit_loss.currency(),
            );
            row.sold_date = Some(*sale_date);
            row.updated_at = *timestamp;
        }
    }
    row.version = envelope.version;
}
