//! Order admission: request shape, validation, reservation arithmetic
//!
//! Every check here runs before any state mutation. Reservation amounts
//! are derived from the order alone, so release at cancel time and
//! surplus release at fill time always balance to zero over an order's
//! lifetime.

use rust_decimal::Decimal;
use types::errors::ValidationError;
use types::ids::{Symbol, UserId};
use types::numeric::{Price, Quantity};
use types::order::{Order, OrderType, Side, TimeInForce};

use crate::config::EngineConfig;

/// An order submission, before validation
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub user_id: UserId,
    pub symbol: Symbol,
    pub side: Side,
    pub order_type: OrderType,
    pub amount: Quantity,
    /// Limit price; for market orders an optional protection bound
    /// (mandatory for market buys, which need a worst-case reserve price)
    pub price: Option<Price>,
    pub time_in_force: TimeInForce,
    pub post_only: bool,
}

impl OrderRequest {
    /// A good-till-cancelled limit order
    pub fn limit(user_id: UserId, symbol: Symbol, side: Side, amount: Quantity, price: Price) -> Self {
        Self {
            user_id,
            symbol,
            side,
            order_type: OrderType::Limit,
            amount,
            price: Some(price),
            time_in_force: TimeInForce::Gtc,
            post_only: false,
        }
    }

    /// A market order; buys must set a protection bound via [`Self::with_bound`]
    pub fn market(user_id: UserId, symbol: Symbol, side: Side, amount: Quantity) -> Self {
        Self {
            user_id,
            symbol,
            side,
            order_type: OrderType::Market,
            amount,
            price: None,
            time_in_force: TimeInForce::Ioc,
            post_only: false,
        }
    }

    /// Set the worst-case price bound of a market order
    pub fn with_bound(mut self, bound: Price) -> Self {
        self.price = Some(bound);
        self
    }

    pub fn with_time_in_force(mut self, time_in_force: TimeInForce) -> Self {
        self.time_in_force = time_in_force;
        self
    }

    pub fn post_only(mut self) -> Self {
        self.post_only = true;
        self
    }
}

/// Validate a request against the engine configuration
///
/// All checks pass before any ledger or book mutation happens.
pub fn validate(config: &EngineConfig, request: &OrderRequest) -> Result<(), ValidationError> {
    if !config.supports(&request.symbol) {
        return Err(ValidationError::UnsupportedSymbol {
            symbol: request.symbol.as_str().to_string(),
        });
    }

    if request.amount < config.min_order_size {
        return Err(ValidationError::AmountBelowMinimum {
            amount: request.amount.as_decimal(),
            minimum: config.min_order_size.as_decimal(),
        });
    }

    match request.order_type {
        OrderType::Limit => {
            let price = request.price.ok_or(ValidationError::MissingPrice)?;
            if price.is_zero() {
                return Err(ValidationError::InvalidPrice {
                    price: price.as_decimal(),
                });
            }
        }
        OrderType::Market => {
            // A market buy spends quote currency, so it needs a worst-case
            // reference price to reserve against. Sells reserve base and
            // may run unbounded.
            if request.side == Side::Buy && request.price.is_none() {
                return Err(ValidationError::MissingPrice);
            }
            if let Some(price) = request.price {
                if price.is_zero() {
                    return Err(ValidationError::InvalidPrice {
                        price: price.as_decimal(),
                    });
                }
            }
            if request.time_in_force == TimeInForce::Gtc {
                return Err(ValidationError::ContradictoryFlags {
                    detail: "market orders cannot rest; use IOC or FOK".to_string(),
                });
            }
        }
    }

    if request.post_only {
        if request.order_type == OrderType::Market {
            return Err(ValidationError::ContradictoryFlags {
                detail: "post-only market order".to_string(),
            });
        }
        if request.time_in_force != TimeInForce::Gtc {
            return Err(ValidationError::ContradictoryFlags {
                detail: "post-only order that can never rest".to_string(),
            });
        }
    }

    Ok(())
}

/// Currency and amount to reserve for a new order
///
/// Buys reserve quote, `amount × bound × (1 + taker_rate)`, with enough
/// headroom to cover the worst-case taker fee on every fill. Sells
/// reserve base: `amount`.
pub fn reservation(order: &Order, taker_rate: Decimal) -> (String, Decimal) {
    match order.side {
        Side::Buy => {
            let bound = order
                .price
                .map(|p| p.as_decimal())
                .unwrap_or(Decimal::ZERO); // unreachable: buys are validated to carry a price
            (
                order.symbol.quote().to_string(),
                order.amount.as_decimal() * bound * (Decimal::ONE + taker_rate),
            )
        }
        Side::Sell => (order.symbol.base().to_string(), order.amount.as_decimal()),
    }
}

/// Currency and amount of the unfilled portion's outstanding reservation
///
/// Per-fill surplus release keeps the outstanding buy reservation at
/// exactly `remaining × bound × (1 + taker_rate)`, so this is what a
/// cancel (or IOC remainder) returns to the user.
pub fn release_amount(order: &Order, taker_rate: Decimal) -> (String, Decimal) {
    match order.side {
        Side::Buy => {
            let bound = order
                .price
                .map(|p| p.as_decimal())
                .unwrap_or(Decimal::ZERO);
            (
                order.symbol.quote().to_string(),
                order.remaining.as_decimal() * bound * (Decimal::ONE + taker_rate),
            )
        }
        Side::Sell => (order.symbol.base().to_string(), order.remaining.as_decimal()),
    }
}
