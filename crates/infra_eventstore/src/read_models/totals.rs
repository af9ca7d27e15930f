//! Per-portfolio totals across investment streams
//!
//! Each investment contributes one tally (cost of units still held, current
//! value, realized P/L, open or not). A portfolio's totals are the sum of
//! its tallies; an event replaces the investment's tally and the totals are
//! adjusted by the difference. Tallies advance one stream version at a
//! time, so a sale is never folded in twice or skipped.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{Currency, EventEnvelope, InvestmentId, PortfolioId};
use domain_investment::InvestmentEvent;

use super::{read, write, Sequencer};
use crate::projection::Projection;

/// Aggregated figures for one portfolio
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioTotals {
    pub portfolio_id: PortfolioId,
    pub currency: Currency,
    /// Purchase cost of the units still held
    pub invested_cost: Decimal,
    pub current_value: Decimal,
    pub realized_profit_loss: Decimal,
    /// Investments not yet fully sold
    pub open_positions: usize,
}

impl PortfolioTotals {
    fn empty(portfolio_id: PortfolioId, currency: Currency) -> Self {
        Self {
            portfolio_id,
            currency,
            invested_cost: Decimal::ZERO,
            current_value: Decimal::ZERO,
            realized_profit_loss: Decimal::ZERO,
            open_positions: 0,
        }
    }

    pub fn unrealized_profit_loss(&self) -> Decimal {
        self.current_value - self.invested_cost
    }
}

#[derive(Debug, Clone, Copy)]
struct Tally {
    portfolio_id: PortfolioId,
    version: u64,
    unit_cost: Decimal,
    quantity: Decimal,
    value: Decimal,
    realized: Decimal,
}

impl Tally {
    fn cost(&self) -> Decimal {
        self.unit_cost * self.quantity
    }

    fn is_open(&self) -> bool {
        self.quantity > Decimal::ZERO
    }
}

#[derive(Debug, Default)]
struct State {
    tallies: HashMap<InvestmentId, Tally>,
    totals: HashMap<PortfolioId, PortfolioTotals>,
    sequencer: Sequencer<InvestmentEvent>,
}

impl State {
    fn absorb(&mut self, envelope: &EventEnvelope<InvestmentEvent>) {
        let event = &envelope.payload;
        let id = event.investment_id();
        let previous = self.tallies.get(&id).copied();

        let (tally, currency) = match (event, previous) {
            (
                InvestmentEvent::InvestmentAdded {
                    portfolio_id,
                    purchase_price,
                    quantity,
                    ..
                },
                None,
            ) => (
                Tally {
                    portfolio_id: *portfolio_id,
                    version: envelope.version,
                    unit_cost: purchase_price.amount(),
                    quantity: *quantity,
                    value: purchase_price.amount() * *quantity,
                    realized: Decimal::ZERO,
                },
                purchase_price.currency(),
            ),
            (InvestmentEvent::InvestmentValueUpdated { new_value, .. }, Some(prev)) => (
                Tally {
                    version: envelope.version,
                    value: new_value.amount(),
                    ..prev
                },
                new_value.currency(),
            ),
            (
                InvestmentEvent::InvestmentSold {
                    remaining_quantity,
                    realized_profit_loss,
                    value_after_sale,
                    ..
                },
                Some(prev),
            ) => (
                Tally {
                    version: envelope.version,
                    quantity: *remaining_quantity,
                    value: value_after_sale.amount(),
                    realized: prev.realized + realized_profit_loss.amount(),
                    ..prev
                },
                value_after_sale.currency(),
            ),
            // a second InvestmentAdded, or a stream that never started
            _ => return,
        };

        self.replace(id, tally, currency);
    }

    fn replace(&mut self, investment_id: InvestmentId, new: Tally, currency: Currency) {
        let old = self.tallies.insert(investment_id, new);
        let totals = self
            .totals
            .entry(new.portfolio_id)
            .or_insert_with(|| PortfolioTotals::empty(new.portfolio_id, currency));

        if let Some(old) = old {
            totals.invested_cost -= old.cost();
            totals.current_value -= old.value;
            totals.realized_profit_loss -= old.realized;
            if old.is_open() {
                totals.open_positions -= 1;
            }
        }
        totals.invested_cost += new.cost();
        totals.current_value += new.value;
        totals.realized_profit_loss += new.realized;
        if new.is_open() {
            totals.open_positions += 1;
        }
    }
}

/// Maintains [`PortfolioTotals`] from investment events
#[derive(Debug, Default)]
pub struct PortfolioTotalsProjection {
    state: RwLock<State>,
}

impl PortfolioTotalsProjection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Totals of a portfolio; `None` until it holds an investment
    pub fn get(&self, portfolio_id: PortfolioId) -> Option<PortfolioTotals> {
        read(&self.state).totals.get(&portfolio_id).cloned()
    }
}

impl Projection<InvestmentEvent> for PortfolioTotalsProjection {
    fn name(&self) -> &'static str {
        "portfolio_totals"
    }

    fn apply(&self, envelope: &EventEnvelope<InvestmentEvent>) -> bool {
        let mut state = write(&self.state);
        let applied = state
            .tallies
            .get(&envelope.payload.investment_id())
            .map_or(0, |tally| tally.version);

        let ready = state.sequencer.ready(applied, envelope);
        for envelope in &ready {
            state.absorb(envelope);
        }
        !ready.is_empty()
    }

    fn reset(&self) {
        let mut state = write(&self.state);
        state.tallies.clear();
        state.totals.clear();
        state.sequencer.clear();
    }
}
