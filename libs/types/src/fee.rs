//! Trading fee schedule
//!
//! One fixed pair of constant rates. The maker rate is below the taker
//! rate to incentivize resting liquidity. Fees apply to the trade value
//! (quantity × price) and are charged in quote currency on both legs.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Fixed maker/taker fee rates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeSchedule {
    /// Rate for the resting (liquidity-adding) side
    pub maker_rate: Decimal,
    /// Rate for the aggressing (liquidity-removing) side
    pub taker_rate: Decimal,
}

impl FeeSchedule {
    /// Create a schedule
    ///
    /// # Panics
    /// Panics if either rate is negative or maker_rate > taker_rate.
    pub fn new(maker_rate: Decimal, taker_rate: Decimal) -> Self {
        assert!(maker_rate >= Decimal::ZERO && taker_rate >= Decimal::ZERO);
        assert!(maker_rate <= taker_rate, "maker rate must not exceed taker rate");
        Self {
            maker_rate,
            taker_rate,
        }
    }

    /// Fee for the maker side of a trade of the given value
    pub fn maker_fee(&self, trade_value: Decimal) -> Decimal {
        trade_value * self.maker_rate
    }

    /// Fee for the taker side of a trade of the given value
    pub fn taker_fee(&self, trade_value: Decimal) -> Decimal {
        trade_value * self.taker_rate
    }
}

impl Default for FeeSchedule {
    /// 0.1% maker / 0.2% taker
    fn default() -> Self {
        Self {
            maker_rate: Decimal::new(1, 3),
            taker_rate: Decimal::new(2, 3),
        }
    }
}
