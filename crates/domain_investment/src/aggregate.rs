//! Investment Aggregate Root
//!
//! # Invariants
//!
//! - `0 <= quantity <= original_quantity`
//! - Purchase price, current price and current value share one currency
//! - A sold investment (quantity zero) accepts no further commands
//! - Every successful command records at most one event

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use core_kernel::{Currency, DomainEvent, InvestmentId, Money, PortfolioId, SignedMoney};

use crate::error::InvestmentError;
use crate::events::InvestmentEvent;
use crate::symbol::Symbol;

/// Investment lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvestmentStatus {
    /// Nothing has been sold yet
    Active,
    /// Some units have been sold, some remain
    PartiallySold,
    /// Every unit has been sold
    Sold,
}

/// The Investment aggregate root
///
/// # State Machine
///
/// - Active -> PartiallySold (via a partial sell)
/// - Active -> Sold (via a complete sell)
/// - PartiallySold -> PartiallySold (via another partial sell)
/// - PartiallySold -> Sold (via the final sell)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Investment {
    id: InvestmentId,
    portfolio_id: PortfolioId,
    symbol: Symbol,
    /// Blended per-unit purchase price
    purchase_price: Money,
    /// Last known per-unit market price
    current_price: Money,
    quantity: Decimal,
    original_quantity: Decimal,
    purchase_date: DateTime<Utc>,
    status: InvestmentStatus,
    current_value: Money,
    sold_date: Option<DateTime<Utc>>,
    /// Cumulative realized P/L across all sales
    realized_profit_loss: Option<SignedMoney>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: u64,
    #[serde(skip)]
    pending_events: Vec<InvestmentEvent>,
}

impl Investment {
    /// Returns the zero-value aggregate that replay starts from
    pub fn empty() -> Self {
        let currency = Currency::default();
        Self {
            id: InvestmentId::NIL,
            portfolio_id: PortfolioId::NIL,
            symbol: Symbol::placeholder(),
            purchase_price: Money::zero(currency),
            current_price: Money::zero(currency),
            quantity: Decimal::ZERO,
            original_quantity: Decimal::ZERO,
            purchase_date: DateTime::<Utc>::default(),
            status: InvestmentStatus::Active,
            current_value: Money::zero(currency),
            sold_date: None,
            realized_profit_loss: None,
            created_at: DateTime::<Utc>::default(),
            updated_at: DateTime::<Utc>::default(),
            version: 0,
            pending_events: Vec::new(),
        }
    }

    /// Opens a new position
    ///
    /// The initial current value is `purchase_price × quantity`.
    ///
    /// # Errors
    ///
    /// Fails if `quantity <= 0`, the purchase price is zero, or
    /// `purchase_date` lies in the future.
    pub fn create(
        id: InvestmentId,
        portfolio_id: PortfolioId,
        symbol: Symbol,
        purchase_price: Money,
        quantity: Decimal,
        purchase_date: DateTime<Utc>,
    ) -> Result<Self, InvestmentError> {
        if quantity <= Decimal::ZERO {
            return Err(InvestmentError::InvalidQuantity(quantity));
        }
        if !purchase_price.is_positive() {
            return Err(InvestmentError::InvalidPrice);
        }
        let now = Utc::now();
        if purchase_date > now {
            return Err(InvestmentError::FutureDate(purchase_date));
        }

        let mut investment = Self::empty();
        investment.record(InvestmentEvent::InvestmentAdded {
            investment_id: id,
            portfolio_id,
            symbol,
            purchase_price,
            quantity,
            purchase_date,
            timestamp: now,
        });
        Ok(investment)
    }

    /// Rebuilds an investment by replaying its event stream in order
    pub fn from_events<'a, I>(events: I) -> Result<Self, InvestmentError>
    where
        I: IntoIterator<Item = &'a InvestmentEvent>,
    {
        let mut investment = Self::empty();
        for event in events {
            match (investment.version, event) {
                (0, InvestmentEvent::InvestmentAdded { .. }) => {}
                (0, other) => {
                    return Err(InvestmentError::InvalidEventSequence(format!(
                        "stream starts with {} instead of InvestmentAdded",
                        other.event_type()
                    )));
                }
                (_, InvestmentEvent::InvestmentAdded { .. }) => {
                    return Err(InvestmentError::InvalidEventSequence(
                        "InvestmentAdded after the start of the stream".to_string(),
                    ));
                }
                (_, other) if other.investment_id() != investment.id => {
                    return Err(InvestmentError::InvalidEventSequence(format!(
                        "event for {} in stream of {}",
                        other.investment_id(),
                        investment.id
                    )));
                }
                _ => {}
            }
            investment.apply(event);
        }

        if investment.version == 0 {
            return Err(InvestmentError::EmptyStream);
        }
        Ok(investment)
    }

    /// Applies an event to the aggregate state
    ///
    /// Exhaustive over [`InvestmentEvent`]; used for both new events and
    /// replay.
    pub fn apply(&mut self, event: &InvestmentEvent) {
        match event {
            InvestmentEvent::InvestmentAdded {
                investment_id,
                portfolio_id,
                symbol,
                purchase_price,
                quantity,
                purchase_date,
                timestamp,
            } => {
                self.id = *investment_id;
                self.portfolio_id = *portfolio_id;
                self.symbol = symbol.clone();
                self.purchase_price = *purchase_price;
                self.current_price = *purchase_price;
                self.quantity = *quantity;
                self.original_quantity = *quantity;
                self.purchase_date = *purchase_date;
                self.status = InvestmentStatus::Active;
                self.current_value = purchase_price
                    .multiply(*quantity)
                    .unwrap_or_else(|_| Money::zero(purchase_price.currency()));
                self.created_at = *timestamp;
                self.updated_at = *timestamp;
            }
            InvestmentEvent::InvestmentValueUpdated {
                new_price,
                new_value,
                timestamp,
                ..
            } => {
                self.current_price = *new_price;
                self.current_value = *new_value;
                self.updated_at = *timestamp;
            }
            InvestmentEvent::InvestmentSold {
                quantity_sold,
                remaining_quantity,
                is_complete_sale,
                realized_profit_loss,
                value_after_sale,
                sale_date,
                timestamp,
                ..
            } => {
                debug_assert_eq!(self.quantity - *quantity_sold, *remaining_quantity);
                self.quantity = *remaining_quantity;
                self.status = if *is_complete_sale {
                    InvestmentStatus::Sold
                } else {
                    InvestmentStatus::PartiallySold
                };
                self.current_value = *value_after_sale;
                self.realized_profit_loss = Some(match self.realized_profit_loss {
                    Some(total) => SignedMoney::new(
                        total.amount() + realized_profit_loss.amount(),
                        total.currency(),
                    ),
                    None => *realized_profit_loss,
                });
                self.sold_date = Some(*sale_date);
                self.updated_at = *timestamp;
            }
        }
        self.version += 1;
    }

    /// Revalues the position at a new per-unit price
    ///
    /// Returns `Ok(false)` without recording an event when the resulting
    /// value equals the current value.
    ///
    /// # Errors
    ///
    /// Fails if the investment is sold or the price currency differs from
    /// the purchase currency.
    pub fn update_value(&mut self, new_price_per_unit: Money) -> Result<bool, InvestmentError> {
        if self.status == InvestmentStatus::Sold {
            return Err(InvestmentError::AlreadySold);
        }
        self.ensure_currency(&new_price_per_unit)?;

        let new_value = new_price_per_unit.multiply(self.quantity)?;
        if new_value == self.current_value {
            return Ok(false);
        }

        debug!(
            investment_id = %self.id,
            old_value = %self.current_value,
            new_value = %new_value,
            "Revaluing investment"
        );
        self.record(InvestmentEvent::InvestmentValueUpdated {
            investment_id: self.id,
            portfolio_id: self.portfolio_id,
            old_price: self.current_price,
            new_price: new_price_per_unit,
            old_value: self.current_value,
            new_value,
            timestamp: Utc::now(),
        });
        Ok(true)
    }

    /// Sells part or all of the position
    ///
    /// `quantity_to_sell = None` sells everything still held. Realized P/L
    /// is `(sale price - purchase price) × quantity sold`, against the
    /// blended purchase price. The remaining units are valued at the last
    /// known per-unit price.
    ///
    /// # Errors
    ///
    /// Fails if the investment is sold, on currency mismatch, if `sale_date`
    /// is in the future, or if the quantity is not positive or exceeds the
    /// quantity held.
    pub fn sell(
        &mut self,
        sale_price_per_unit: Money,
        quantity_to_sell: Option<Decimal>,
        sale_date: DateTime<Utc>,
    ) -> Result<(), InvestmentError> {
        if self.status == InvestmentStatus::Sold {
            return Err(InvestmentError::AlreadySold);
        }
        self.ensure_currency(&sale_price_per_unit)?;
        let now = Utc::now();
        if sale_date > now {
            return Err(InvestmentError::FutureDate(sale_date));
        }

        let quantity_sold = quantity_to_sell.unwrap_or(self.quantity);
        if quantity_sold <= Decimal::ZERO {
            return Err(InvestmentError::InvalidQuantity(quantity_sold));
        }
        if quantity_sold > self.quantity {
            return Err(InvestmentError::InsufficientQuantity {
                requested: quantity_sold,
                available: self.quantity,
            });
        }

        let remaining_quantity = self.quantity - quantity_sold;
        let is_complete_sale = remaining_quantity.is_zero();
        let realized_profit_loss = sale_price_per_unit
            .difference(&self.purchase_price)?
            .multiply(quantity_sold);
        let cost_basis_sold = self.purchase_price.multiply(quantity_sold)?;
        let value_after_sale = if is_complete_sale {
            Money::zero(self.currency())
        } else {
            self.current_price.multiply(remaining_quantity)?
        };

        debug!(
            investment_id = %self.id,
            %quantity_sold,
            %remaining_quantity,
            realized = %realized_profit_loss,
            "Selling investment"
        );
        self.record(InvestmentEvent::InvestmentSold {
            investment_id: self.id,
            portfolio_id: self.portfolio_id,
            sale_price: sale_price_per_unit,
            quantity_sold,
            remaining_quantity,
            is_complete_sale,
            realized_profit_loss,
            cost_basis_sold,
            value_after_sale,
            sale_date,
            timestamp: now,
        });
        Ok(())
    }

    /// Return on investment, in percent
    ///
    /// Before any sale: `(current value - total cost) / total cost × 100`.
    /// Once any portion is sold: `realized P/L / total cost × 100`, where
    /// total cost is the purchase cost of the original quantity.
    pub fn roi(&self) -> Decimal {
        let total_cost = self.total_cost().amount();
        if total_cost.is_zero() {
            return Decimal::ZERO;
        }
        match self.realized_profit_loss {
            Some(realized) => realized.amount() / total_cost * dec!(100),
            None => (self.current_value.amount() - total_cost) / total_cost * dec!(100),
        }
    }

    /// Purchase cost of the original quantity
    pub fn total_cost(&self) -> Money {
        Money::new(
            self.purchase_price.amount() * self.original_quantity,
            self.currency(),
        )
        .unwrap_or_else(|_| Money::zero(self.currency()))
    }

    /// Current value minus the purchase cost of the units still held
    pub fn unrealized_profit_loss(&self) -> SignedMoney {
        SignedMoney::new(
            self.current_value.amount() - self.purchase_price.amount() * self.quantity,
            self.currency(),
        )
    }

    /// Returns recorded events and clears them
    pub fn take_events(&mut self) -> Vec<InvestmentEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Returns events recorded but not yet taken
    pub fn pending_events(&self) -> &[InvestmentEvent] {
        &self.pending_events
    }

    /// Version of the stream as it was loaded, before pending events
    pub fn committed_version(&self) -> u64 {
        self.version - self.pending_events.len() as u64
    }

    pub fn id(&self) -> InvestmentId {
        self.id
    }

    pub fn portfolio_id(&self) -> PortfolioId {
        self.portfolio_id
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn purchase_price(&self) -> Money {
        self.purchase_price
    }

    pub fn current_price(&self) -> Money {
        self.current_price
    }

    pub fn quantity(&self) -> Decimal {
        self.quantity
    }

    pub fn original_quantity(&self) -> Decimal {
        self.original_quantity
    }

    pub fn purchase_date(&self) -> DateTime<Utc> {
        self.purchase_date
    }

    pub fn status(&self) -> InvestmentStatus {
        self.status
    }

    pub fn current_value(&self) -> Money {
        self.current_value
    }

    pub fn sold_date(&self) -> Option<DateTime<Utc>> {
        self.sold_date
    }

    pub fn realized_profit_loss(&self) -> Option<SignedMoney> {
        self.realized_profit_loss
    }

    pub fn currency(&self) -> Currency {
        self.purchase_price.currency()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Number of events applied, including pending ones
    pub fn version(&self) -> u64 {
        self.version
    }

    fn record(&mut self, event: InvestmentEvent) {
        self.apply(&event);
        self.pending_events.push(event);
    }

    fn ensure_currency(&self, price: &Money) -> Result<(), InvestmentError> {
        if price.currency() != self.currency() {
            return Err(InvestmentError::currency_mismatch(
                self.currency(),
                price.currency(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::AssetType;
    use chrono::Duration;

    fn usd(amount: Decimal) -> Money {
        Money::new(amount, Currency::USD).unwrap()
    }

    fn create_test_investment(quantity: Decimal) -> Investment {
        Investment::create(
            InvestmentId::new_v7(),
            PortfolioId::new(),
            Symbol::new("MSFT", "NASDAQ", AssetType::Stock).unwrap(),
            usd(dec!(100)),
            quantity,
            Utc::now() - Duration::days(30),
        )
        .unwrap()
    }

    #[test]
    fn test_initial_value_is_cost() {
        let investment = create_test_investment(dec!(10));
        assert_eq!(investment.current_value(), usd(dec!(1000)));
        assert_eq!(investment.status(), InvestmentStatus::Active);
        assert_eq!(investment.roi(), Decimal::ZERO);
    }

    #[test]
    fn test_partial_then_complete_sale() {
        let mut investment = create_test_investment(dec!(10));
        investment.sell(usd(dec!(110)), Some(dec!(4)), Utc::now()).unwrap();
        assert_eq!(investment.status(), InvestmentStatus::PartiallySold);
        assert_eq!(investment.current_value(), usd(dec!(600)));

        investment.sell(usd(dec!(90)), None, Utc::now()).unwrap();
        assert_eq!(investment.status(), InvestmentStatus::Sold);
        assert!(investment.current_value().is_zero());
        // 4 × 10 - 6 × 10
        assert_eq!(investment.realized_profit_loss().unwrap().amount(), dec!(-20));
    }

    #[test]
    fn test_unchanged_value_records_nothing() {
        let mut investment = create_test_investment(dec!(10));
        let changed = investment.update_value(usd(dec!(100))).unwrap();
        assert!(!changed);
        assert_eq!(investment.version(), 1);
    }
}
