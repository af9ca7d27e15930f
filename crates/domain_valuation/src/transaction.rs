//! Transaction records consumed by the calculators

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Types of ledger transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Buy,
    Sell,
    Dividend,
    Interest,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Buy => "BUY",
            TransactionType::Sell => "SELL",
            TransactionType::Dividend => "DIVIDEND",
            TransactionType::Interest => "INTEREST",
        }
    }

    /// True for transactions that move units in or out of the position
    pub fn is_trade(&self) -> bool {
        matches!(self, TransactionType::Buy | TransactionType::Sell)
    }
}

/// A historical transaction, read-only input to the calculators
///
/// Trades carry `quantity` and `price_per_unit`; income transactions carry
/// `gross_amount`. `fee` applies to the whole transaction, not per unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_type: TransactionType,
    pub quantity: Option<Decimal>,
    pub price_per_unit: Option<Decimal>,
    pub fee: Option<Decimal>,
    pub gross_amount: Option<Decimal>,
    pub transaction_date: DateTime<Utc>,
}

impl Transaction {
    /// Creates a buy
    pub fn buy(quantity: Decimal, price_per_unit: Decimal, transaction_date: DateTime<Utc>) -> Self {
        Self::trade(TransactionType::Buy, quantity, price_per_unit, transaction_date)
    }

    /// Creates a sell
    pub fn sell(quantity: Decimal, price_per_unit: Decimal, transaction_date: DateTime<Utc>) -> Self {
        Self::trade(TransactionType::Sell, quantity, price_per_unit, transaction_date)
    }

    /// Creates a dividend payment
    pub fn dividend(gross_amount: Decimal, transaction_date: DateTime<Utc>) -> Self {
        Self::income(TransactionType::Dividend, gross_amount, transaction_date)
    }

    /// Creates an interest payment
    pub fn interest(gross_amount: Decimal, transaction_date: DateTime<Utc>) -> Self {
        Self::income(TransactionType::Interest, gross_amount, transaction_date)
    }

    /// Sets the transaction fee
    pub fn with_fee(mut self, fee: Decimal) -> Self {
        self.fee = Some(fee);
        self
    }

    fn trade(
        transaction_type: TransactionType,
        quantity: Decimal,
        price_per_unit: Decimal,
        transaction_date: DateTime<Utc>,
    ) -> Self {
        Self {
            transaction_type,
            quantity: Some(quantity),
            price_per_unit: Some(price_per_unit),
            fee: None,
            gross_amount: None,
            transaction_date,
        }
    }

    fn income(
        transaction_type: TransactionType,
        gross_amount: Decimal,
        transaction_date: DateTime<Utc>,
    ) -> Self {
        Self {
            transaction_type,
            quantity: None,
            price_per_unit: None,
            fee: None,
            gross_amount: Some(gross_amount),
            transaction_date,
        }
    }
}
