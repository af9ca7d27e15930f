//! Instrument symbols

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::InvestmentError;

/// Maximum ticker length
pub const MAX_TICKER_LENGTH: usize = 10;

/// Classes of instrument a position can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetType {
    Stock,
    Etf,
    /// Exchange-traded bond, quoted as a percentage of nominal
    Bond,
    /// Retail treasury bond with a fixed nominal and scheduled interest periods
    TreasuryBond,
    Crypto,
    MutualFund,
    Commodity,
    Cash,
    Other,
}

impl AssetType {
    /// True for instruments whose quotes are a percentage of nominal value
    pub fn is_percent_quoted(&self) -> bool {
        matches!(self, AssetType::Bond)
    }
}

/// A validated instrument identifier
///
/// The ticker is trimmed and upper-cased on construction, including when a
/// symbol is read back from a stored event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawSymbol", into = "RawSymbol")]
pub struct Symbol {
    ticker: String,
    exchange: String,
    asset_type: AssetType,
}

/// Wire shape of [`Symbol`], validated on deserialization
#[derive(Serialize, Deserialize)]
struct RawSymbol {
    ticker: String,
    exchange: String,
    asset_type: AssetType,
}

impl TryFrom<RawSymbol> for Symbol {
    type Error = InvestmentError;

    fn try_from(raw: RawSymbol) -> Result<Self, Self::Error> {
        Symbol::new(&raw.ticker, &raw.exchange, raw.asset_type)
    }
}

impl From<Symbol> for RawSymbol {
    fn from(symbol: Symbol) -> Self {
        RawSymbol {
            ticker: symbol.ticker,
            exchange: symbol.exchange,
            asset_type: symbol.asset_type,
        }
    }
}

impl Symbol {
    /// Creates a symbol
    ///
    /// # Errors
    ///
    /// Returns [`InvestmentError::InvalidSymbol`] if the ticker is empty or
    /// longer than [`MAX_TICKER_LENGTH`], or the exchange is empty.
    pub fn new(
        ticker: &str,
        exchange: &str,
        asset_type: AssetType,
    ) -> Result<Self, InvestmentError> {
        let ticker = ticker.trim().to_uppercase();
        if ticker.is_empty() {
            return Err(InvestmentError::InvalidSymbol("ticker cannot be empty".to_string()));
        }
        if ticker.chars().count() > MAX_TICKER_LENGTH {
            return Err(InvestmentError::InvalidSymbol(format!(
                "ticker '{}' exceeds {} characters",
                ticker, MAX_TICKER_LENGTH
            )));
        }

        let exchange = exchange.trim();
        if exchange.is_empty() {
            return Err(InvestmentError::InvalidSymbol("exchange cannot be empty".to_string()));
        }

        Ok(Self {
            ticker,
            exchange: exchange.to_string(),
            asset_type,
        })
    }

    /// Symbol of a zero-value aggregate before its creation event is applied
    pub(crate) fn placeholder() -> Self {
        Self {
            ticker: String::new(),
            exchange: String::new(),
            asset_type: AssetType::Other,
        }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    pub fn asset_type(&self) -> AssetType {
        self.asset_type
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.exchange, self.ticker)
    }
}
