//! Order lifecycle types
//!
//! An order is a user's trading intent. Status transitions are monotonic
//! and one-directional: `Pending → Open → {Filled | Cancelled}` and
//! `Pending → Rejected`. Terminal orders are immutable.

use crate::ids::{OrderId, Symbol, UserId};
use crate::numeric::{Price, Quantity};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order side (buyer or seller)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Buy order (bid)
    Buy,
    /// Sell order (ask)
    Sell,
}

impl Side {
    /// Get the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Order type
///
/// Closed enum, exhaustively matched wherever execution behavior is
/// computed, so a new variant forces a review of the matching algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    /// Execute immediately against resting liquidity
    Market,
    /// Execute at the limit price or better, rest otherwise
    Limit,
}

/// Time-in-force policy for orders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimeInForce {
    /// Good-Till-Cancelled: remains until filled or explicitly cancelled
    Gtc,
    /// Immediate-Or-Cancel: match immediately, cancel remainder
    Ioc,
    /// Fill-Or-Kill: full match or reject entirely
    Fok,
}

/// Why an order was cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CancelReason {
    UserRequested,
    /// Remainder of an immediate-or-cancel (or market) order after matching
    ImmediateOrCancel,
}

/// Why an order was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectReason {
    /// Ledger reservation failed
    InsufficientFunds,
    /// Fill-or-kill order could not be fully satisfied in one pass
    FillOrKillUnfillable,
    /// Post-only order would have executed immediately
    PostOnlyWouldCross,
    /// Ledger was unreachable during reservation
    LedgerUnavailable,
}

/// Order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason")]
pub enum OrderStatus {
    /// Accepted, funds not yet reserved
    #[serde(rename = "pending")]
    Pending,

    /// Resting or matching; the only state a cancel may target
    #[serde(rename = "open")]
    Open,

    /// Completely executed (terminal)
    #[serde(rename = "filled")]
    Filled,

    /// Cancelled by the user or by time-in-force policy (terminal)
    #[serde(rename = "cancelled")]
    Cancelled(CancelReason),

    /// Never entered the book (terminal)
    #[serde(rename = "rejected")]
    Rejected(RejectReason),
}

impl OrderStatus {
    /// Check if status is terminal (no further transitions possible)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled(_) | OrderStatus::Rejected(_)
        )
    }
}

/// A user's trading intent plus its mutable execution state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub symbol: Symbol,
    pub side: Side,
    pub order_type: OrderType,
    /// Requested quantity, fixed for the lifetime of the order
    pub amount: Quantity,
    /// Limit price; for market buys this is the worst-case reserve bound
    pub price: Option<Price>,
    pub time_in_force: TimeInForce,
    pub post_only: bool,
    pub status: OrderStatus,
    /// Cumulative executed quantity, monotonically non-decreasing
    pub filled: Quantity,
    /// `amount - filled`
    pub remaining: Quantity,
    /// Quantity-weighted mean of executed fills
    pub average_price: Option<Price>,
    /// Per-symbol arrival counter; the deterministic time-priority tie-break
    pub sequence: u64,
    pub created_at: i64, // Unix nanos
    pub updated_at: i64, // Unix nanos
}

impl Order {
    /// Create a new pending order
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: UserId,
        symbol: Symbol,
        side: Side,
        order_type: OrderType,
        amount: Quantity,
        price: Option<Price>,
        time_in_force: TimeInForce,
        post_only: bool,
        sequence: u64,
        timestamp: i64,
    ) -> Self {
        Self {
            id: OrderId::new(),
            user_id,
            symbol,
            side,
            order_type,
            amount,
            price,
            time_in_force,
            post_only,
            status: OrderStatus::Pending,
            filled: Quantity::zero(),
            remaining: amount,
            average_price: None,
            sequence,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Check quantity invariant: filled + remaining = amount
    pub fn check_invariant(&self) -> bool {
        self.filled.as_decimal() + self.remaining.as_decimal() == self.amount.as_decimal()
    }

    /// Check if order is completely filled
    pub fn is_filled(&self) -> bool {
        self.filled == self.amount
    }

    /// Check if order has any fills
    pub fn has_fills(&self) -> bool {
        !self.filled.is_zero()
    }

    /// Transition `Pending → Open` once funds are reserved
    ///
    /// # Panics
    /// Panics if the order is not pending.
    pub fn open(&mut self, timestamp: i64) {
        assert_eq!(self.status, OrderStatus::Pending, "open() requires a pending order");
        self.status = OrderStatus::Open;
        self.updated_at = timestamp;
    }

    /// Record an execution against this order
    ///
    /// Updates `filled`/`remaining`, recomputes the quantity-weighted
    /// average price, and transitions to `Filled` when nothing remains.
    ///
    /// # Panics
    /// Panics if the order is not open or the fill exceeds the remaining
    /// quantity; callers guarantee both under the symbol lock.
    pub fn add_fill(&mut self, quantity: Quantity, price: Price, timestamp: i64) {
        assert_eq!(self.status, OrderStatus::Open, "fill requires an open order");

        let new_filled = self.filled + quantity;
        assert!(
            new_filled.as_decimal() <= self.amount.as_decimal(),
            "Fill would exceed order amount"
        );

        let prev_notional = self
            .average_price
            .map(|p| p.as_decimal() * self.filled.as_decimal())
            .unwrap_or(Decimal::ZERO);
        let new_notional = prev_notional + price.as_decimal() * quantity.as_decimal();
        self.average_price = Price::try_new(new_notional / new_filled.as_decimal());

        self.filled = new_filled;
        self.remaining = self.amount.saturating_sub(new_filled);

        if self.is_filled() {
            self.status = OrderStatus::Filled;
        }

        self.updated_at = timestamp;

        assert!(self.check_invariant(), "Invariant violated after fill");
    }

    /// Cancel the order
    ///
    /// # Panics
    /// Panics if order is already in a terminal state.
    pub fn cancel(&mut self, reason: CancelReason, timestamp: i64) {
        assert!(!self.status.is_terminal(), "Cannot cancel terminal order");

        self.status = OrderStatus::Cancelled(reason);
        self.updated_at = timestamp;
    }

    /// Reject the order before it enters the book
    ///
    /// # Panics
    /// Panics if the order is not pending.
    pub fn reject(&mut self, reason: RejectReason, timestamp: i64) {
        assert_eq!(self.status, OrderStatus::Pending, "reject() requires a pending order");
        self.status = OrderStatus::Rejected(reason);
        self.updated_at = timestamp;
    }
}
