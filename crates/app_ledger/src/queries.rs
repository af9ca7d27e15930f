//! Read-side queries
//!
//! Lookups go to the read models only; nothing here touches the event log.
//! The valuation calculators are pure and are exposed alongside so callers
//! have a single query surface.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use core_kernel::{InvestmentId, OwnerId, PortfolioId};
use domain_investment::{AssetType, InvestmentStatus};
use domain_valuation::{
    summarize_transactions, BondValuation, BondValuator, PositionSummary, PricingConvention,
    Transaction, TreasuryBondDetails,
};
use infra_eventstore::read_models::{
    InvestmentProjection, InvestmentReadModel, PortfolioProjection, PortfolioReadModel,
    PortfolioTotals, PortfolioTotalsProjection,
};
use infra_eventstore::{Page, Paged};

use crate::error::LedgerError;

#[derive(Clone)]
pub struct LedgerQueries {
    portfolios: Arc<PortfolioProjection>,
    investments: Arc<InvestmentProjection>,
    totals: Arc<PortfolioTotalsProjection>,
    valuator: BondValuator,
}

impl LedgerQueries {
    pub fn new(
        portfolios: Arc<PortfolioProjection>,
        investments: Arc<InvestmentProjection>,
        totals: Arc<PortfolioTotalsProjection>,
    ) -> Self {
        Self {
            portfolios,
            investments,
            totals,
            valuator: BondValuator::default(),
        }
    }

    /// Replaces the bond valuator, e.g. to apply another tax rate
    pub fn with_valuator(mut self, valuator: BondValuator) -> Self {
        self.valuator = valuator;
        self
    }

    pub fn get_portfolio(&self, id: PortfolioId) -> Result<PortfolioReadModel, LedgerError> {
        self.portfolios
            .get(id)
            .ok_or_else(|| LedgerError::not_found("Portfolio", id))
    }

    pub fn list_portfolios(
        &self,
        owner_id: OwnerId,
        include_closed: bool,
        page: Page,
    ) -> Paged<PortfolioReadModel> {
        self.portfolios.list_by_owner(owner_id, include_closed, page)
    }

    pub fn get_investment(&self, id: InvestmentId) -> Result<InvestmentReadModel, LedgerError> {
        self.investments
            .get(id)
            .ok_or_else(|| LedgerError::not_found("Investment", id))
    }

    pub fn list_investments(&self, portfolio_id: PortfolioId, page: Page) -> Paged<InvestmentReadModel> {
        self.investments.list_by_portfolio(portfolio_id, page)
    }

    pub fn investments_by_status(
        &self,
        status: InvestmentStatus,
        page: Page,
    ) -> Paged<InvestmentReadModel> {
        self.investments.list_by_status(status, page)
    }

    pub fn investments_by_asset_type(
        &self,
        asset_type: AssetType,
        page: Page,
    ) -> Paged<InvestmentReadModel> {
        self.investments.list_by_asset_type(asset_type, page)
    }

    /// Totals of a portfolio's investments
    ///
    /// A portfolio that exists but holds nothing yet has no totals row and
    /// reports [`LedgerError::NotFound`] as well.
    pub fn portfolio_totals(&self, portfolio_id: PortfolioId) -> Result<PortfolioTotals, LedgerError> {
        self.totals
            .get(portfolio_id)
            .ok_or_else(|| LedgerError::not_found("PortfolioTotals", portfolio_id))
    }

    pub fn value_bond(
        &self,
        details: &TreasuryBondDetails,
        quantity: Decimal,
        as_of: Option<NaiveDate>,
    ) -> Result<BondValuation, LedgerError> {
        Ok(self.valuator.calculate(details, quantity, as_of)?)
    }

    pub fn value_bond_early_redemption(
        &self,
        details: &TreasuryBondDetails,
        quantity: Decimal,
        as_of: Option<NaiveDate>,
    ) -> Result<BondValuation, LedgerError> {
        Ok(self.valuator.calculate_early_redemption(details, quantity, as_of)?)
    }

    /// FIFO summary of a transaction history
    pub fn summarize(
        &self,
        transactions: &[Transaction],
        pricing: PricingConvention,
    ) -> Result<PositionSummary, LedgerError> {
        Ok(summarize_transactions(transactions, pricing)?)
    }
}
