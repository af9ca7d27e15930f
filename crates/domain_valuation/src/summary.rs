//! Position summary over a transaction history

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cost_basis::{self, CostBasis, Fill};
use crate::error::ValuationError;
use crate::pricing::PricingConvention;
use crate::transaction::{Transaction, TransactionType};

/// Figures derived from a position's transaction history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionSummary {
    pub cost_basis: CostBasis,
    pub total_bought: Decimal,
    pub total_sold: Decimal,
    pub dividend_income: Decimal,
    pub interest_income: Decimal,
    pub total_fees: Decimal,
    pub transaction_count: usize,
    pub first_transaction: Option<DateTime<Utc>>,
    pub last_transaction: Option<DateTime<Utc>>,
}

impl PositionSummary {
    /// Realized gains plus dividend and interest income
    pub fn total_return(&self) -> Decimal {
        self.cost_basis.realized_gains + self.dividend_income + self.interest_income
    }
}

/// Summarizes a transaction history
///
/// Transactions are ordered by date before matching; ties keep their input
/// order. Trade prices are converted with `pricing`, so percent-quoted bond
/// trades and per-unit trades go through the same FIFO matching.
///
/// # Errors
///
/// Returns [`ValuationError::MissingField`] if a trade lacks quantity or
/// price, or an income transaction lacks its gross amount.
pub fn summarize_transactions(
    transactions: &[Transaction],
    pricing: PricingConvention,
) -> Result<PositionSummary, ValuationError> {
    let mut ordered: Vec<&Transaction> = transactions.iter().collect();
    ordered.sort_by_key(|tx| tx.transaction_date);

    let mut buys = Vec::new();
    let mut sells = Vec::new();
    let mut dividend_income = Decimal::ZERO;
    let mut interest_income = Decimal::ZERO;
    let mut total_fees = Decimal::ZERO;

    for tx in &ordered {
        let fee = tx.fee.unwrap_or(Decimal::ZERO);
        total_fees += fee;

        match tx.transaction_type {
            TransactionType::Buy | TransactionType::Sell => {
                let quantity = required(tx, tx.quantity, "quantity")?;
                let price = required(tx, tx.price_per_unit, "price_per_unit")?;
                let fill = Fill::new(quantity, pricing.unit_price(price), fee);
                if tx.transaction_type == TransactionType::Buy {
                    buys.push(fill);
                } else {
                    sells.push(fill);
                }
            }
            TransactionType::Dividend => {
                dividend_income += required(tx, tx.gross_amount, "gross_amount")? - fee;
            }
            TransactionType::Interest => {
                interest_income += required(tx, tx.gross_amount, "gross_amount")? - fee;
            }
        }
    }

    Ok(PositionSummary {
        cost_basis: cost_basis::calculate(&buys, &sells),
        total_bought: buys.iter().map(|fill| fill.quantity).sum(),
        total_sold: sells.iter().map(|fill| fill.quantity).sum(),
        dividend_income,
        interest_income,
        total_fees,
        transaction_count: ordered.len(),
        first_transaction: ordered.first().map(|tx| tx.transaction_date),
        last_transaction: ordered.last().map(|tx| tx.transaction_date),
    })
}

fn required(
    tx: &Transaction,
    value: Option<Decimal>,
    field: &'static str,
) -> Result<Decimal, ValuationError> {
    value.ok_or(ValuationError::MissingField {
        transaction_type: tx.transaction_type.as_str(),
        field,
    })
}
