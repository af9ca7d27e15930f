//! Treasury bond valuation
//!
//! Retail treasury bonds accrue interest in yearly periods. Interest for a
//! period counts towards the value only once the period has ended; there is
//! no intra-period proration. Accrued interest is taxed at 19% and an
//! early redemption costs a fixed fee per bond.
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use core_kernel::{Currency, Money};
//! use domain_valuation::bond::{BondTerms, BondType, BondValuator, InterestPeriod, TreasuryBondDetails};
//! use rust_decimal_macros::dec;
//!
//! let issue = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
//! let year_later = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let maturity = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
//! let nominal = Money::new(dec!(100), Currency::PLN).unwrap();
//!
//! let terms = BondTerms {
//!     bond_type: BondType::TOS,
//!     issue_date: issue,
//!     maturity_date: maturity,
//!     nominal_value: nominal,
//!     first_year_rate: dec!(6.80),
//!     margin: dec!(0),
//!     early_redemption_fee: Money::new(dec!(0.70), Currency::PLN).unwrap(),
//! };
//! let periods = vec![InterestPeriod::from_rate(1, issue, year_later, dec!(6.80), dec!(100))];
//! let details = TreasuryBondDetails::new(terms, periods).unwrap();
//!
//! let valuation = BondValuator::default()
//!     .calculate(&details, dec!(1), Some(year_later))
//!     .unwrap();
//! assert_eq!(valuation.net_value_per_bond.amount(), dec!(105.508));
//! ```

use chrono::{Datelike, Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use core_kernel::{Money, Rate, SignedMoney};

use crate::error::ValuationError;

/// Tax withheld on bond interest
pub const BOND_TAX_RATE: Decimal = dec!(0.19);

/// Retail treasury bond series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BondType {
    /// 3-month fixed rate
    OTS,
    /// 1-year floating rate
    ROR,
    /// 2-year floating rate
    DOR,
    /// 3-year fixed rate
    TOS,
    /// 4-year inflation indexed
    COI,
    /// 10-year inflation indexed
    EDO,
    /// 6-year family bond, inflation indexed
    ROS,
    /// 12-year family bond, inflation indexed
    ROD,
}

impl BondType {
    /// Term of the series in months
    pub fn duration_months(&self) -> u32 {
        match self {
            BondType::OTS => 3,
            BondType::ROR => 12,
            BondType::DOR => 24,
            BondType::TOS => 36,
            BondType::COI => 48,
            BondType::EDO => 120,
            BondType::ROS => 72,
            BondType::ROD => 144,
        }
    }

    /// True when later periods follow an index plus margin
    pub fn is_indexed(&self) -> bool {
        !matches!(self, BondType::OTS | BondType::TOS)
    }
}

/// One interest period of a bond
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterestPeriod {
    pub period_number: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Annual rate in percent
    pub interest_rate: Decimal,
    /// Interest earned per bond over the whole period
    pub accrued_interest: Decimal,
}

impl InterestPeriod {
    /// Builds a period whose accrued interest is `nominal × rate / 100`
    pub fn from_rate(
        period_number: u32,
        start_date: NaiveDate,
        end_date: NaiveDate,
        interest_rate: Decimal,
        nominal_value: Decimal,
    ) -> Self {
        Self {
            period_number,
            start_date,
            end_date,
            interest_rate,
            accrued_interest: nominal_value * interest_rate / dec!(100),
        }
    }

    /// True once the period has ended on or before `as_of`
    pub fn is_complete(&self, as_of: NaiveDate) -> bool {
        self.end_date <= as_of
    }
}

/// Fixed terms of a bond series purchase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BondTerms {
    pub bond_type: BondType,
    pub issue_date: NaiveDate,
    pub maturity_date: NaiveDate,
    pub nominal_value: Money,
    /// Rate of the first period, in percent
    pub first_year_rate: Decimal,
    /// Margin over the index for later periods, in percent
    pub margin: Decimal,
    /// Fee per bond on early redemption
    pub early_redemption_fee: Money,
}

/// A bond with its validated interest schedule
///
/// Periods are numbered from 1, ordered, contiguous and non-overlapping,
/// and lie within the bond's term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreasuryBondDetails {
    terms: BondTerms,
    interest_periods: Vec<InterestPeriod>,
}

impl TreasuryBondDetails {
    /// Validates terms and schedule
    ///
    /// # Errors
    ///
    /// Fails on a non-positive nominal, a maturity not after issue, a fee in
    /// another currency, or a schedule that is misnumbered, has gaps or
    /// overlaps, or falls outside the term.
    pub fn new(terms: BondTerms, interest_periods: Vec<InterestPeriod>) -> Result<Self, ValuationError> {
        validate_terms(&terms)?;
        validate_periods(&terms, &interest_periods)?;
        Ok(Self {
            terms,
            interest_periods,
        })
    }

    /// Builds yearly periods from the first-year rate and known index values
    ///
    /// Period 1 uses `first_year_rate`; period `n + 2` uses
    /// `margin + index_rates[n]`. Generation stops at maturity or when the
    /// index values run out. A final period shorter than a year accrues
    /// pro rata by whole months.
    pub fn schedule(terms: BondTerms, index_rates: &[Decimal]) -> Result<Self, ValuationError> {
        validate_terms(&terms)?;

        let nominal = terms.nominal_value.amount();
        let rates = std::iter::once(terms.first_year_rate)
            .chain(index_rates.iter().map(|index| terms.margin + index));

        let mut periods = Vec::new();
        let mut start = terms.issue_date;
        for (number, rate) in (1u32..).zip(rates) {
            if start >= terms.maturity_date {
                break;
            }
            let full_year = start
                .checked_add_months(Months::new(12))
                .ok_or_else(|| ValuationError::schedule("date out of range"))?;

            let period = if full_year <= terms.maturity_date {
                InterestPeriod::from_rate(number, start, full_year, rate, nominal)
            } else {
                let months = months_between(start, terms.maturity_date);
                let mut period =
                    InterestPeriod::from_rate(number, start, terms.maturity_date, rate, nominal);
                period.accrued_interest = period.accrued_interest * Decimal::from(months) / dec!(12);
                period
            };
            start = period.end_date;
            periods.push(period);
        }

        debug!(bond_type = ?terms.bond_type, periods = periods.len(), "Built interest schedule");
        Self::new(terms, periods)
    }

    pub fn terms(&self) -> &BondTerms {
        &self.terms
    }

    pub fn bond_type(&self) -> BondType {
        self.terms.bond_type
    }

    pub fn issue_date(&self) -> NaiveDate {
        self.terms.issue_date
    }

    pub fn maturity_date(&self) -> NaiveDate {
        self.terms.maturity_date
    }

    pub fn nominal_value(&self) -> Money {
        self.terms.nominal_value
    }

    pub fn early_redemption_fee(&self) -> Money {
        self.terms.early_redemption_fee
    }

    pub fn interest_periods(&self) -> &[InterestPeriod] {
        &self.interest_periods
    }

    /// Interest per bond from periods completed by `as_of`
    pub fn accrued_interest(&self, as_of: NaiveDate) -> Decimal {
        self.interest_periods
            .iter()
            .filter(|period| period.is_complete(as_of))
            .map(|period| period.accrued_interest)
            .sum()
    }
}

fn validate_terms(terms: &BondTerms) -> Result<(), ValuationError> {
    if !terms.nominal_value.is_positive() {
        return Err(ValuationError::InvalidNominal);
    }
    if terms.maturity_date <= terms.issue_date {
        return Err(ValuationError::InvalidTerm {
            issue: terms.issue_date,
            maturity: terms.maturity_date,
        });
    }
    // fails on mismatch
    terms.nominal_value.add(&terms.early_redemption_fee)?;
    Ok(())
}

fn validate_periods(terms: &BondTerms, periods: &[InterestPeriod]) -> Result<(), ValuationError> {
    let mut previous: Option<&InterestPeriod> = None;
    for (expected_number, period) in (1u32..).zip(periods) {
        if period.period_number != expected_number {
            return Err(ValuationError::schedule(format!(
                "expected period {} but found {}",
                expected_number, period.period_number
            )));
        }
        if period.start_date >= period.end_date {
            return Err(ValuationError::schedule(format!(
                "period {} ends before it starts",
                period.period_number
            )));
        }
        if period.accrued_interest < Decimal::ZERO {
            return Err(ValuationError::schedule(format!(
                "period {} has negative interest",
                period.period_number
            )));
        }
        match previous {
            None if period.start_date < terms.issue_date => {
                return Err(ValuationError::schedule("first period starts before issue"));
            }
            Some(prev) if prev.end_date != period.start_date => {
                return Err(ValuationError::schedule(format!(
                    "period {} does not start where period {} ends",
                    period.period_number, prev.period_number
                )));
            }
            _ => {}
        }
        previous = Some(period);
    }

    if let Some(last) = previous {
        if last.end_date > terms.maturity_date {
            return Err(ValuationError::schedule("last period ends after maturity"));
        }
    }
    Ok(())
}

fn months_between(from: NaiveDate, to: NaiveDate) -> u32 {
    let months = (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32;
    months.max(0) as u32
}

/// Valuation of a bond position as of a date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BondValuation {
    pub quantity: Decimal,
    pub as_of_date: NaiveDate,
    pub completed_periods: usize,
    pub accrued_interest_per_bond: Money,
    pub gross_value_per_bond: Money,
    pub tax_per_bond: Money,
    pub net_value_per_bond: Money,
    pub total_nominal_value: Money,
    pub total_accrued_interest: Money,
    pub total_gross_value: Money,
    pub total_tax: Money,
    pub total_net_value: Money,
    /// Negative once the bond has matured
    pub days_to_maturity: i64,
    pub is_early_redemption: bool,
    /// Zero unless this is an early redemption
    pub early_redemption_fee: Money,
    /// `total_net_value` less the early-redemption fee; negative when the
    /// fee outweighs the position
    pub net_value_after_fee: SignedMoney,
}

/// Values treasury bond positions
#[derive(Debug, Clone, Copy)]
pub struct BondValuator {
    tax_rate: Rate,
}

impl Default for BondValuator {
    fn default() -> Self {
        Self {
            tax_rate: Rate::new(BOND_TAX_RATE),
        }
    }
}

impl BondValuator {
    pub fn with_tax_rate(tax_rate: Rate) -> Self {
        Self { tax_rate }
    }

    pub fn tax_rate(&self) -> Rate {
        self.tax_rate
    }

    /// Values `quantity` bonds as of `as_of` (today when `None`)
    ///
    /// # Errors
    ///
    /// Returns [`ValuationError::NegativeQuantity`] for a negative quantity.
    pub fn calculate(
        &self,
        details: &TreasuryBondDetails,
        quantity: Decimal,
        as_of: Option<NaiveDate>,
    ) -> Result<BondValuation, ValuationError> {
        if quantity < Decimal::ZERO {
            return Err(ValuationError::NegativeQuantity(quantity));
        }
        let as_of = as_of.unwrap_or_else(|| Utc::now().date_naive());
        let currency = details.nominal_value().currency();
        let nominal = details.nominal_value().amount();

        let accrued = details.accrued_interest(as_of);
        let tax = self.tax_rate.apply(accrued);
        let gross = nominal + accrued;
        let net = gross - tax;

        let total_net_value = Money::new(net * quantity, currency)?;
        let valuation = BondValuation {
            quantity,
            as_of_date: as_of,
            completed_periods: details
                .interest_periods()
                .iter()
                .filter(|period| period.is_complete(as_of))
                .count(),
            accrued_interest_per_bond: Money::new(accrued, currency)?,
            gross_value_per_bond: Money::new(gross, currency)?,
            tax_per_bond: Money::new(tax, currency)?,
            net_value_per_bond: Money::new(net, currency)?,
            total_nominal_value: Money::new(nominal * quantity, currency)?,
            total_accrued_interest: Money::new(accrued * quantity, currency)?,
            total_gross_value: Money::new(gross * quantity, currency)?,
            total_tax: Money::new(tax * quantity, currency)?,
            total_net_value,
            days_to_maturity: (details.maturity_date() - as_of).num_days(),
            is_early_redemption: false,
            early_redemption_fee: Money::zero(currency),
            net_value_after_fee: total_net_value.to_signed(),
        };

        debug!(
            bond_type = ?details.bond_type(),
            %quantity,
            %as_of,
            net = %valuation.total_net_value,
            "Valued bond position"
        );
        Ok(valuation)
    }

    /// Values the position as if redeemed early on `as_of`
    ///
    /// The fee is `early_redemption_fee × quantity` and is taken off the
    /// total net value even when that leaves the position below zero.
    pub fn calculate_early_redemption(
        &self,
        details: &TreasuryBondDetails,
        quantity: Decimal,
        as_of: Option<NaiveDate>,
    ) -> Result<BondValuation, ValuationError> {
        let mut valuation = self.calculate(details, quantity, as_of)?;
        let fee = details.early_redemption_fee().multiply(quantity)?;

        valuation.net_value_after_fee = valuation.total_net_value.difference(&fee)?;
        valuation.early_redemption_fee = fee;
        valuation.is_early_redemption = true;
        Ok(valuation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn pln(amount: Decimal) -> Money {
        Money::new(amount, Currency::PLN).unwrap()
    }

    fn terms(bond_type: BondType, years: i32) -> BondTerms {
        BondTerms {
            bond_type,
            issue_date: date(2022, 3, 1),
            maturity_date: date(2022 + years, 3, 1),
            nominal_value: pln(dec!(100)),
            first_year_rate: dec!(7.25),
            margin: dec!(1.25),
            early_redemption_fee: pln(dec!(2)),
        }
    }

    #[test]
    fn test_gap_in_schedule_rejected() {
        let periods = vec![
            InterestPeriod::from_rate(1, date(2022, 3, 1), date(2023, 3, 1), dec!(7), dec!(100)),
            InterestPeriod::from_rate(2, date(2023, 3, 2), date(2024, 3, 1), dec!(7), dec!(100)),
        ];
        let result = TreasuryBondDetails::new(terms(BondType::TOS, 3), periods);
        assert!(matches!(result, Err(ValuationError::InvalidSchedule(_))));
    }

    #[test]
    fn test_misnumbered_schedule_rejected() {
        let periods = vec![InterestPeriod::from_rate(
            2,
            date(2022, 3, 1),
            date(2023, 3, 1),
            dec!(7),
            dec!(100),
        )];
        assert!(TreasuryBondDetails::new(terms(BondType::TOS, 3), periods).is_err());
    }

    #[test]
    fn test_period_past_maturity_rejected() {
        let periods = vec![InterestPeriod::from_rate(
            1,
            date(2022, 3, 1),
            date(2025, 3, 1),
            dec!(7),
            dec!(100),
        )];
        assert!(TreasuryBondDetails::new(terms(BondType::ROR, 1), periods).is_err());
    }

    #[test]
    fn test_schedule_uses_margin_plus_index() {
        let details =
            TreasuryBondDetails::schedule(terms(BondType::COI, 4), &[dec!(10.1), dec!(3.6)]).unwrap();

        let periods = details.interest_periods();
        assert_eq!(periods.len(), 3);
        assert_eq!(periods[0].interest_rate, dec!(7.25));
        assert_eq!(periods[1].interest_rate, dec!(11.35));
        assert_eq!(periods[2].accrued_interest, dec!(4.85));
        assert_eq!(periods[2].end_date, date(2025, 3, 1));
    }

    #[test]
    fn test_short_bond_prorates_final_period() {
        let mut short = terms(BondType::OTS, 0);
        short.maturity_date = date(2022, 6, 1);
        short.first_year_rate = dec!(3);

        let details = TreasuryBondDetails::schedule(short, &[]).unwrap();

        assert_eq!(details.interest_periods().len(), 1);
        assert_eq!(details.interest_periods()[0].accrued_interest, dec!(0.75));
    }

    #[test]
    fn test_negative_quantity_rejected() {
        let details = TreasuryBondDetails::new(terms(BondType::TOS, 3), vec![]).unwrap();
        assert_eq!(
            BondValuator::default().calculate(&details, dec!(-1), None),
            Err(ValuationError::NegativeQuantity(dec!(-1)))
        );
    }

    #[test]
    fn test_fee_above_value_goes_negative() {
        let mut expensive = terms(BondType::ROR, 1);
        expensive.early_redemption_fee = pln(dec!(150));
        let details = TreasuryBondDetails::new(expensive, vec![]).unwrap();

        let valuation = BondValuator::default()
            .calculate_early_redemption(&details, dec!(2), Some(date(2022, 6, 1)))
            .unwrap();

        assert_eq!(valuation.total_net_value, pln(dec!(200)));
        assert_eq!(valuation.early_redemption_fee, pln(dec!(300)));
        assert_eq!(valuation.net_value_after_fee.amount(), dec!(-100));
        assert!(valuation.net_value_after_fee.is_negative());
    }

    #[test]
    fn test_days_to_maturity_negative_after_maturity() {
        let details = TreasuryBondDetails::new(terms(BondType::ROR, 1), vec![]).unwrap();
        let valuation = BondValuator::default()
            .calculate(&details, dec!(1), Some(date(2023, 3, 11)))
            .unwrap();
        assert_eq!(valuation.days_to_maturity, -10);
    }
}
