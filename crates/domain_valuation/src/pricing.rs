//! Quote conventions
//!
//! Exchange-traded bonds are quoted as a percentage of nominal value
//! rather than per unit. A quote of `67.39` on a 1000 nominal bond means
//! one unit is worth 673.90.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::ValuationError;

/// How a quoted price converts into an absolute value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PricingConvention {
    /// The quote is the price of one unit
    #[default]
    PerUnit,
    /// The quote is a percentage of `nominal_value`
    PercentOfNominal { nominal_value: Decimal },
}

impl PricingConvention {
    /// Builds a percent-of-nominal convention
    ///
    /// # Errors
    ///
    /// Returns [`ValuationError::InvalidNominal`] unless the nominal is positive.
    pub fn percent_of_nominal(nominal_value: Decimal) -> Result<Self, ValuationError> {
        if nominal_value <= Decimal::ZERO {
            return Err(ValuationError::InvalidNominal);
        }
        Ok(PricingConvention::PercentOfNominal { nominal_value })
    }

    /// Price of one unit for a given quote
    pub fn unit_price(&self, quoted_price: Decimal) -> Decimal {
        match self {
            PricingConvention::PerUnit => quoted_price,
            PricingConvention::PercentOfNominal { nominal_value } => {
                quoted_price / dec!(100) * *nominal_value
            }
        }
    }

    /// Absolute value of `quantity` units at `quoted_price`
    ///
    /// Used alike for purchase cost and market value.
    pub fn absolute_value(&self, quantity: Decimal, quoted_price: Decimal) -> Decimal {
        quantity * self.unit_price(quoted_price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_unit_is_identity() {
        let pricing = PricingConvention::PerUnit;
        assert_eq!(pricing.absolute_value(dec!(3), dec!(12.5)), dec!(37.5));
    }

    #[test]
    fn test_non_positive_nominal_rejected() {
        assert_eq!(
            PricingConvention::percent_of_nominal(dec!(0)),
            Err(ValuationError::InvalidNominal)
        );
    }
}
