//! Command handlers
//!
//! Every command is one short unit of work:
//!
//! 1. load the stream and replay it into the aggregate
//! 2. stop with [`LedgerError::Cancelled`] if the token has fired
//! 3. run the aggregate method, which validates and records events
//! 4. append under the version the stream was loaded at
//!
//! Aggregates are never cached between commands.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use core_kernel::{Currency, EventStore, InvestmentId, Money, OwnerId, PortfolioId, UserId};
use domain_investment::{Investment, InvestmentEvent, Symbol};
use domain_portfolio::{Portfolio, PortfolioEvent};
use domain_valuation::PricingConvention;

use crate::error::LedgerError;

#[derive(Debug, Clone)]
pub struct CreatePortfolio {
    pub owner_id: OwnerId,
    pub name: String,
    pub description: Option<String>,
    pub currency: Currency,
}

#[derive(Debug, Clone)]
pub struct RenamePortfolio {
    pub portfolio_id: PortfolioId,
    pub new_name: String,
}

#[derive(Debug, Clone)]
pub struct UpdatePortfolioDetails {
    pub portfolio_id: PortfolioId,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ClosePortfolio {
    pub portfolio_id: PortfolioId,
    pub reason: Option<String>,
    pub closed_by: UserId,
}

/// Opens a position
///
/// Prices are quotes read through `pricing`: bonds are quoted as a percent of
/// nominal, everything else per unit.
#[derive(Debug, Clone)]
pub struct AddInvestment {
    pub portfolio_id: PortfolioId,
    pub symbol: Symbol,
    pub purchase_price: Money,
    pub pricing: PricingConvention,
    pub quantity: Decimal,
    pub purchase_date: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct UpdateInvestmentValue {
    pub investment_id: InvestmentId,
    pub new_price_per_unit: Money,
    pub pricing: PricingConvention,
}

#[derive(Debug, Clone)]
pub struct SellInvestment {
    pub investment_id: InvestmentId,
    pub sale_price_per_unit: Money,
    pub pricing: PricingConvention,
    /// `None` sells everything held
    pub quantity: Option<Decimal>,
    pub sale_date: DateTime<Utc>,
}

/// Turns a quote into the price of one unit of `symbol`
fn unit_price(
    symbol: &Symbol,
    quote: Money,
    pricing: PricingConvention,
) -> Result<Money, LedgerError> {
    let asset_type = symbol.asset_type();
    let percent_quoted = matches!(pricing, PricingConvention::PercentOfNominal { .. });
    if percent_quoted != asset_type.is_percent_quoted() {
        return Err(LedgerError::PricingMismatch { asset_type, pricing });
    }
    Ok(Money::new(pricing.unit_price(quote.amount()), quote.currency())?)
}

fn ensure_not_cancelled(cancel: &CancellationToken) -> Result<(), LedgerError> {
    if cancel.is_cancelled() {
        warn!("Command cancelled before append");
        return Err(LedgerError::Cancelled);
    }
    Ok(())
}

/// Loads a portfolio by replaying its stream
pub(crate) async fn load_portfolio(
    store: &dyn EventStore<PortfolioEvent>,
    id: PortfolioId,
) -> Result<Portfolio, LedgerError> {
    let events: Vec<PortfolioEvent> = store
        .load(*id.as_uuid())
        .await?
        .into_iter()
        .map(|envelope| envelope.payload)
        .collect();
    if events.is_empty() {
        return Err(LedgerError::not_found("Portfolio", id));
    }
    Ok(Portfolio::from_events(&events)?)
}

/// Loads an investment by replaying its stream
pub(crate) async fn load_investment(
    store: &dyn EventStore<InvestmentEvent>,
    id: InvestmentId,
) -> Result<Investment, LedgerError> {
    let events: Vec<InvestmentEvent> = store
        .load(*id.as_uuid())
        .await?
        .into_iter()
        .map(|envelope| envelope.payload)
        .collect();
    if events.is_empty() {
        return Err(LedgerError::not_found("Investment", id));
    }
    Ok(Investment::from_events(&events)?)
}

/// Handles portfolio commands
#[derive(Clone)]
pub struct PortfolioCommands {
    store: Arc<dyn EventStore<PortfolioEvent>>,
}

impl PortfolioCommands {
    pub fn new(store: Arc<dyn EventStore<PortfolioEvent>>) -> Self {
        Self { store }
    }

    /// Creates a portfolio and returns its id
    pub async fn create(
        &self,
        command: CreatePortfolio,
        cancel: &CancellationToken,
    ) -> Result<PortfolioId, LedgerError> {
        let id = PortfolioId::new_v7();
        let portfolio = Portfolio::create(
            id,
            command.owner_id,
            &command.name,
            command.description,
            command.currency,
        )?;

        ensure_not_cancelled(cancel)?;
        self.commit(portfolio).await?;
        info!(portfolio_id = %id, owner_id = %command.owner_id, "Portfolio created");
        Ok(id)
    }

    pub async fn rename(
        &self,
        command: RenamePortfolio,
        cancel: &CancellationToken,
    ) -> Result<u64, LedgerError> {
        let mut portfolio = self.load(command.portfolio_id).await?;
        ensure_not_cancelled(cancel)?;
        portfolio.rename(&command.new_name)?;
        self.commit(portfolio).await
    }

    pub async fn update_details(
        &self,
        command: UpdatePortfolioDetails,
        cancel: &CancellationToken,
    ) -> Result<u64, LedgerError> {
        let mut portfolio = self.load(command.portfolio_id).await?;
        ensure_not_cancelled(cancel)?;
        portfolio.update_details(&command.name, command.description)?;
        self.commit(portfolio).await
    }

    pub async fn close(
        &self,
        command: ClosePortfolio,
        cancel: &CancellationToken,
    ) -> Result<u64, LedgerError> {
        let mut portfolio = self.load(command.portfolio_id).await?;
        ensure_not_cancelled(cancel)?;
        portfolio.close(command.reason, command.closed_by)?;
        let version = self.commit(portfolio).await?;
        info!(portfolio_id = %command.portfolio_id, "Portfolio closed");
        Ok(version)
    }

    /// Replays a portfolio from its stream
    pub async fn load(&self, id: PortfolioId) -> Result<Portfolio, LedgerError> {
        load_portfolio(self.store.as_ref(), id).await
    }

    async fn commit(&self, mut portfolio: Portfolio) -> Result<u64, LedgerError> {
        let expected = portfolio.committed_version();
        let events = portfolio.take_events();
        Ok(self
            .store
            .append(*portfolio.id().as_uuid(), expected, events)
            .await?)
    }
}

/// Handles investment commands
#[derive(Clone)]
pub struct InvestmentCommands {
    store: Arc<dyn EventStore<InvestmentEvent>>,
    portfolios: Arc<dyn EventStore<PortfolioEvent>>,
}

impl InvestmentCommands {
    pub fn new(
        store: Arc<dyn EventStore<InvestmentEvent>>,
        portfolios: Arc<dyn EventStore<PortfolioEvent>>,
    ) -> Self {
        Self { store, portfolios }
    }

    /// Opens a position in an existing, open portfolio
    pub async fn add(
        &self,
        command: AddInvestment,
        cancel: &CancellationToken,
    ) -> Result<InvestmentId, LedgerError> {
        let portfolio = load_portfolio(self.portfolios.as_ref(), command.portfolio_id).await?;
        if portfolio.is_closed() {
            return Err(LedgerError::PortfolioClosed(command.portfolio_id));
        }
        if command.purchase_price.currency() != portfolio.currency() {
            return Err(LedgerError::CurrencyMismatch {
                portfolio: portfolio.currency(),
                investment: command.purchase_price.currency(),
            });
        }
        let purchase_price = unit_price(&command.symbol, command.purchase_price, command.pricing)?;

        let id = InvestmentId::new_v7();
        let investment = Investment::create(
            id,
            command.portfolio_id,
            command.symbol,
            purchase_price,
            command.quantity,
            command.purchase_date,
        )?;

        ensure_not_cancelled(cancel)?;
        self.commit(investment).await?;
        info!(investment_id = %id, portfolio_id = %command.portfolio_id, "Investment added");
        Ok(id)
    }

    /// Revalues a position
    ///
    /// Returns `None` when the value did not change and nothing was written.
    pub async fn update_value(
        &self,
        command: UpdateInvestmentValue,
        cancel: &CancellationToken,
    ) -> Result<Option<u64>, LedgerError> {
        let mut investment = self.load(command.investment_id).await?;
        let price = unit_price(investment.symbol(), command.new_price_per_unit, command.pricing)?;
        ensure_not_cancelled(cancel)?;
        if !investment.update_value(price)? {
            return Ok(None);
        }
        Ok(Some(self.commit(investment).await?))
    }

    pub async fn sell(
        &self,
        command: SellInvestment,
        cancel: &CancellationToken,
    ) -> Result<u64, LedgerError> {
        let mut investment = self.load(command.investment_id).await?;
        let price = unit_price(investment.symbol(), command.sale_price_per_unit, command.pricing)?;
        ensure_not_cancelled(cancel)?;
        investment.sell(price, command.quantity, command.sale_date)?;
        let version = self.commit(investment).await?;
        info!(investment_id = %command.investment_id, version, "Investment sold");
        Ok(version)
    }

    /// Replays an investment from its stream
    pub async fn load(&self, id: InvestmentId) -> Result<Investment, LedgerError> {
        load_investment(self.store.as_ref(), id).await
    }

    async fn commit(&self, mut investment: Investment) -> Result<u64, LedgerError> {
        let expected = investment.committed_version();
        let events = investment.take_events();
        Ok(self
            .store
            .append(*investment.id().as_uuid(), expected, events)
            .await?)
    }
}
