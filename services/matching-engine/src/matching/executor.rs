//! Trade construction
//!
//! Builds trade records with fees and a global monotonic sequence.

use std::sync::atomic::{AtomicU64, Ordering};

use rust_decimal::Decimal;
use types::errors::CoreError;
use types::fee::FeeSchedule;
use types::ids::{OrderId, Symbol, UserId};
use types::numeric::{Price, Quantity};
use types::order::Side;
use types::trade::Trade;

/// Builds trades and assigns the global trade sequence
pub struct TradeExecutor {
    sequence: AtomicU64,
    fees: FeeSchedule,
}

impl TradeExecutor {
    /// Create a new executor with a starting sequence number
    pub fn new(starting_sequence: u64, fees: FeeSchedule) -> Self {
        Self {
            sequence: AtomicU64::new(starting_sequence),
            fees,
        }
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }

    /// Construct the trade record for one match
    ///
    /// The taker side pays the taker rate, the maker side the maker rate,
    /// both applied to `quantity × price` and charged in quote currency.
    #[allow(clippy::too_many_arguments)]
    pub fn execute_trade(
        &self,
        symbol: Symbol,
        buy_order_id: OrderId,
        sell_order_id: OrderId,
        buy_user_id: UserId,
        sell_user_id: UserId,
        taker_side: Side,
        price: Price,
        quantity: Quantity,
        timestamp: i64,
    ) -> Result<Trade, CoreError> {
        // Self-trades are skipped during book scanning; reaching this
        // point with one is an integration bug, not a user error.
        if buy_user_id == sell_user_id {
            return Err(CoreError::SettlementInvariant {
                detail: format!("self-trade between orders {buy_order_id} and {sell_order_id}"),
            });
        }

        let (buyer_fee, seller_fee) = self.calculate_fees(taker_side, price, quantity);

        Ok(Trade::new(
            self.next_sequence(),
            symbol,
            buy_order_id,
            sell_order_id,
            buy_user_id,
            sell_user_id,
            taker_side,
            price,
            quantity,
            buyer_fee,
            seller_fee,
            timestamp,
        ))
    }

    /// Fees for both legs: (buyer_fee, seller_fee)
    fn calculate_fees(&self, taker_side: Side, price: Price, quantity: Quantity) -> (Decimal, Decimal) {
        let trade_value = quantity.as_decimal() * price.as_decimal();

        match taker_side {
            Side::Buy => (self.fees.taker_fee(trade_value), self.fees.maker_fee(trade_value)),
            Side::Sell => (self.fees.maker_fee(trade_value), self.fees.taker_fee(trade_value)),
        }
    }
}
