//! Pre-built Test Fixtures
//!
//! Consistent, predictable values for unit and integration tests.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use core_kernel::{Currency, Money};
use domain_investment::{AssetType, Symbol};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    /// Creates a USD amount
    pub fn usd(amount: Decimal) -> Money {
        Self::of(amount, Currency::USD)
    }

    /// Creates a PLN amount
    pub fn pln(amount: Decimal) -> Money {
        Self::of(amount, Currency::PLN)
    }

    /// Standard purchase price
    pub fn usd_100() -> Money {
        Self::usd(dec!(100))
    }

    /// Creates a EUR amount for currency mismatch tests
    pub fn eur_100() -> Money {
        Self::of(dec!(100), Currency::EUR)
    }

    /// Treasury bond nominal value
    pub fn bond_nominal() -> Money {
        Self::pln(dec!(100))
    }

    fn of(amount: Decimal, currency: Currency) -> Money {
        Money::new(amount, currency).expect("fixture amounts are non-negative")
    }
}

/// Fixture for dates
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// A fixed purchase timestamp in the past
    pub fn purchase_date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()
    }

    /// Yesterday, relative to the wall clock
    pub fn yesterday() -> DateTime<Utc> {
        Utc::now() - Duration::days(1)
    }

    /// Tomorrow, for future-date rejection tests
    pub fn tomorrow() -> DateTime<Utc> {
        Utc::now() + Duration::days(1)
    }

    pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid fixture date")
    }
}

/// Fixture for instrument symbols
pub struct SymbolFixtures;

impl SymbolFixtures {
    pub fn stock() -> Symbol {
        Symbol::new("AAPL", "NASDAQ", AssetType::Stock).unwrap()
    }

    pub fn etf() -> Symbol {
        Symbol::new("VWCE", "XETRA", AssetType::Etf).unwrap()
    }

    pub fn bond() -> Symbol {
        Symbol::new("DS1030", "GPW", AssetType::Bond).unwrap()
    }

    pub fn treasury_bond() -> Symbol {
        Symbol::new("EDO0434", "PKO", AssetType::TreasuryBond).unwrap()
    }
}
