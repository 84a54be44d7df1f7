//! Trade settlement records
//!
//! A trade is an immutable record produced by a single match between one
//! buy and one sell order.

use crate::ids::{OrderId, Symbol, TradeId, UserId};
use crate::numeric::{Price, Quantity};
use crate::order::Side;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Immutable settlement record for one match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    /// Global monotonic sequence across all symbols
    pub sequence: u64,
    pub symbol: Symbol,

    pub buy_order_id: OrderId,
    pub sell_order_id: OrderId,
    pub buy_user_id: UserId,
    pub sell_user_id: UserId,

    /// Which side removed liquidity (pays the taker rate)
    pub taker_side: Side,
    pub price: Price,
    pub amount: Quantity,

    /// Fee paid by the buyer, in quote currency
    pub buyer_fee: Decimal,
    /// Fee paid by the seller, in quote currency
    pub seller_fee: Decimal,

    pub created_at: i64, // Unix nanos
}

impl Trade {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sequence: u64,
        symbol: Symbol,
        buy_order_id: OrderId,
        sell_order_id: OrderId,
        buy_user_id: UserId,
        sell_user_id: UserId,
        taker_side: Side,
        price: Price,
        amount: Quantity,
        buyer_fee: Decimal,
        seller_fee: Decimal,
        created_at: i64,
    ) -> Self {
        Self {
            id: TradeId::new(),
            sequence,
            symbol,
            buy_order_id,
            sell_order_id,
            buy_user_id,
            sell_user_id,
            taker_side,
            price,
            amount,
            buyer_fee,
            seller_fee,
            created_at,
        }
    }

    /// Trade value (price × amount) in quote currency
    pub fn trade_value(&self) -> Decimal {
        self.amount.as_decimal() * self.price.as_decimal()
    }

    /// Validate the no-self-trade invariant
    pub fn validate_no_self_trade(&self) -> bool {
        self.buy_user_id != self.sell_user_id
    }
}
