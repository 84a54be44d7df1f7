//! Bid (buy-side) order book
//!
//! Maintains buy orders sorted by price descending (best bid first).
//! Uses BTreeMap for deterministic iteration order.

use rust_decimal::Decimal;
use std::collections::BTreeMap;
use types::ids::{OrderId, UserId};
use types::numeric::{Price, Quantity};

use super::price_level::PriceLevel;
use super::BookLevel;

/// Bid (buy) side order book
///
/// Orders are sorted by price descending, so the highest bid is first.
/// At each price level, orders are maintained in FIFO order.
#[derive(Debug, Clone, Default)]
pub struct BidBook {
    /// Price levels; BTreeMap ensures deterministic iteration
    levels: BTreeMap<Price, PriceLevel>,
}

impl BidBook {
    /// Create a new empty bid book
    pub fn new() -> Self {
        Self {
            levels: BTreeMap::new(),
        }
    }

    /// Insert an order into the bid book
    pub fn insert(&mut self, price: Price, order_id: OrderId, user_id: UserId, remaining: Quantity) {
        let level = self.levels.entry(price).or_insert_with(PriceLevel::new);
        level.insert(order_id, user_id, remaining);
    }

    /// Remove an order from the bid book
    ///
    /// Returns true if the order was found and removed
    pub fn remove(&mut self, order_id: &OrderId, price: Price) -> bool {
        if let Some(level) = self.levels.get_mut(&price) {
            if level.remove(order_id).is_some() {
                // Remove empty price levels to keep book clean
                if level.is_empty() {
                    self.levels.remove(&price);
                }
                return true;
            }
        }
        false
    }

    /// Reduce a resting order's cached remaining quantity after a fill
    ///
    /// Returns false if the order is not resting at that price.
    pub fn reduce(&mut self, order_id: &OrderId, price: Price, quantity: Quantity) -> bool {
        let Some(level) = self.levels.get_mut(&price) else {
            return false;
        };
        let reduced = level.reduce(order_id, quantity);
        if level.is_empty() {
            self.levels.remove(&price);
        }
        reduced
    }

    /// Get the best bid (highest price) with its aggregate quantity
    pub fn best_bid(&self) -> Option<(Price, Quantity)> {
        // BTreeMap iter is ascending, so we need last()
        self.levels
            .iter()
            .next_back()
            .map(|(price, level)| (*price, level.total_quantity()))
    }

    /// Get the best bid price
    pub fn best_bid_price(&self) -> Option<Price> {
        self.levels.keys().next_back().copied()
    }

    /// Best resting bid not owned by `user`, in price-time priority order
    ///
    /// Scans levels from the highest price down, skipping the user's own
    /// orders (which stay resting) until a counterparty is found.
    pub fn best_counterparty(&self, user: &UserId) -> Option<(Price, OrderId, UserId, Quantity)> {
        self.levels.iter().rev().find_map(|(price, level)| {
            level
                .first_counterparty(user)
                .map(|(order_id, user_id, qty)| (*price, order_id, user_id, qty))
        })
    }

    /// Total quantity not owned by `user` at prices crossing `limit`
    ///
    /// A bid crosses a sell limit when its price is >= the limit; `None`
    /// (unbounded market sell) counts every level.
    pub fn crossable_quantity(&self, user: &UserId, limit: Option<Price>) -> Decimal {
        self.levels
            .iter()
            .rev()
            .take_while(|(price, _)| limit.map_or(true, |l| **price >= l))
            .map(|(_, level)| level.counterparty_quantity(user))
            .sum()
    }

    /// Iterate all entries in price-time priority order
    pub fn entries(&self) -> impl Iterator<Item = (Price, OrderId, UserId, Quantity)> + '_ {
        self.levels.iter().rev().flat_map(|(price, level)| {
            level
                .iter()
                .map(move |entry| (*price, entry.order_id, entry.user_id, entry.remaining))
        })
    }

    /// Get depth snapshot (top N price levels, aggregated)
    pub fn depth_snapshot(&self, depth: usize) -> Vec<BookLevel> {
        self.levels
            .iter()
            .rev() // highest prices first
            .take(depth)
            .map(|(price, level)| BookLevel {
                price: *price,
                quantity: level.total_quantity(),
                orders: level.order_count(),
            })
            .collect()
    }

    /// Check if the bid book is empty
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Get the total number of price levels
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }
}
