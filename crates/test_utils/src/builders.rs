//! Test Data Builders
//!
//! Builders that construct aggregates with sensible defaults, so tests only
//! spell out the fields they care about. Built aggregates still hold their
//! creation event as pending.

use chrono::{DateTime, Utc};
use core_kernel::{Currency, InvestmentId, Money, OwnerId, PortfolioId};
use domain_investment::{Investment, Symbol};
use domain_portfolio::Portfolio;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::fixtures::{MoneyFixtures, SymbolFixtures, TemporalFixtures};

/// Builder for portfolios under test
pub struct TestPortfolioBuilder {
    id: PortfolioId,
    owner_id: OwnerId,
    name: String,
    description: Option<String>,
    currency: Currency,
}

impl Default for TestPortfolioBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestPortfolioBuilder {
    pub fn new() -> Self {
        Self {
            id: PortfolioId::new_v7(),
            owner_id: OwnerId::new(),
            name: "Retirement".to_string(),
            description: None,
            currency: Currency::USD,
        }
    }

    pub fn with_id(mut self, id: PortfolioId) -> Self {
        self.id = id;
        self
    }

    pub fn with_owner(mut self, owner_id: OwnerId) -> Self {
        self.owner_id = owner_id;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    /// Builds the portfolio
    ///
    /// # Panics
    ///
    /// Panics if the configured name is invalid
    pub fn build(self) -> Portfolio {
        Portfolio::create(self.id, self.owner_id, &self.name, self.description, self.currency)
            .expect("builder produces a valid portfolio")
    }
}

/// Builder for investments under test
pub struct TestInvestmentBuilder {
    id: InvestmentId,
    portfolio_id: PortfolioId,
    symbol: Symbol,
    purchase_price: Money,
    quantity: Decimal,
    purchase_date: DateTime<Utc>,
}

impl Default for TestInvestmentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestInvestmentBuilder {
    pub fn new() -> Self {
        Self {
            id: InvestmentId::new_v7(),
            portfolio_id: PortfolioId::new_v7(),
            symbol: SymbolFixtures::stock(),
            purchase_price: MoneyFixtures::usd_100(),
            quantity: dec!(10),
            purchase_date: TemporalFixtures::purchase_date(),
        }
    }

    pub fn with_id(mut self, id: InvestmentId) -> Self {
        self.id = id;
        self
    }

    pub fn with_portfolio(mut self, portfolio_id: PortfolioId) -> Self {
        self.portfolio_id = portfolio_id;
        self
    }

    pub fn with_symbol(mut self, symbol: Symbol) -> Self {
        self.symbol = symbol;
        self
    }

    pub fn with_purchase_price(mut self, price: Money) -> Self {
        self.purchase_price = price;
        self
    }

    pub fn with_quantity(mut self, quantity: Decimal) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn with_purchase_date(mut self, date: DateTime<Utc>) -> Self {
        self.purchase_date = date;
        self
    }

    /// Builds the investment
    ///
    /// # Panics
    ///
    /// Panics if the configured values break an invariant
    pub fn build(self) -> Investment {
        Investment::create(
            self.id,
            self.portfolio_id,
            self.symbol,
            self.purchase_price,
            self.quantity,
            self.purchase_date,
        )
        .expect("builder produces a valid investment")
    }
}
