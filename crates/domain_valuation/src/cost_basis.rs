//! FIFO cost basis
//!
//! Buys seed a queue of lots in the order given. Each sell relieves lots
//! from the front of the queue: a lot that is used up books its gain and is
//! dropped, a lot that is only partly used is reduced in place.
//!
//! Buy fees are spread over the lot as a per-unit amount and form part of
//! its cost. Sell fees are subtracted from realized gains once, after every
//! sell has been matched.

use std::collections::VecDeque;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One side of a trade as seen by the calculator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fill {
    pub quantity: Decimal,
    pub price: Decimal,
    /// Fee for the whole fill
    pub fee: Decimal,
}

impl Fill {
    pub fn new(quantity: Decimal, price: Decimal, fee: Decimal) -> Self {
        Self { quantity, price, fee }
    }
}

/// Result of a cost-basis calculation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostBasis {
    /// Units left in unconsumed lots
    pub remaining_quantity: Decimal,
    /// `total_cost / remaining_quantity`, zero when nothing remains
    pub average_cost: Decimal,
    /// Cost of the unconsumed lots, fees included
    pub total_cost: Decimal,
    /// Proceeds minus relieved cost, minus sell fees
    pub realized_gains: Decimal,
}

impl CostBasis {
    pub fn empty() -> Self {
        Self {
            remaining_quantity: Decimal::ZERO,
            average_cost: Decimal::ZERO,
            total_cost: Decimal::ZERO,
            realized_gains: Decimal::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Lot {
    quantity: Decimal,
    price: Decimal,
    fee_per_unit: Decimal,
}

impl Lot {
    fn unit_cost(&self) -> Decimal {
        self.price + self.fee_per_unit
    }
}

/// Calculates remaining position and realized gains with FIFO lot relief
///
/// Over-selling is not rejected here: once the lots are exhausted the rest
/// of the sell is ignored.
pub fn calculate(buys: &[Fill], sells: &[Fill]) -> CostBasis {
    let mut lots: VecDeque<Lot> = buys
        .iter()
        .filter(|buy| buy.quantity > Decimal::ZERO)
        .map(|buy| Lot {
            quantity: buy.quantity,
            price: buy.price,
            fee_per_unit: buy.fee / buy.quantity,
        })
        .collect();

    let mut realized_gains = Decimal::ZERO;
    let mut sell_fees = Decimal::ZERO;

    for sell in sells {
        sell_fees += sell.fee;
        let mut to_relieve = sell.quantity;

        while to_relieve > Decimal::ZERO {
            let Some(lot) = lots.front_mut() else {
                warn!(unmatched = %to_relieve, "Sell exceeds available lots");
                break;
            };

            if lot.quantity <= to_relieve {
                realized_gains += sell.price * lot.quantity - lot.unit_cost() * lot.quantity;
                to_relieve -= lot.quantity;
                lots.pop_front();
            } else {
                realized_gains += sell.price * to_relieve - lot.unit_cost() * to_relieve;
                lot.quantity -= to_relieve;
                to_relieve = Decimal::ZERO;
            }
        }
    }

    realized_gains -= sell_fees;

    let remaining_quantity: Decimal = lots.iter().map(|lot| lot.quantity).sum();
    let total_cost: Decimal = lots.iter().map(|lot| lot.unit_cost() * lot.quantity).sum();
    let average_cost = if remaining_quantity.is_zero() {
        Decimal::ZERO
    } else {
        total_cost / remaining_quantity
    };

    CostBasis {
        remaining_quantity,
        average_cost,
        total_cost,
        realized_gains,
    }
}
