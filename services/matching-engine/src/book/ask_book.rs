//! Ask (sell-side) order book
//!
//! Maintains sell orders sorted by price ascending (best ask first).
//! Uses BTreeMap for deterministic iteration order.

use rust_decimal::Decimal;
use std::collections::BTreeMap;
use types::ids::{OrderId, UserId};
use types::numeric::{Price, Quantity};

use super::price_level::PriceLevel;
use super::BookLevel;

/// Ask (sell) side order book
///
/// Orders are sorted by price ascending, so the lowest ask is first.
/// At each price level, orders are maintained in FIFO order.
#[derive(Debug, Clone, Default)]
pub struct AskBook {
    /// Price levels; BTreeMap ensures deterministic iteration
    levels: BTreeMap<Price, PriceLevel>,
}

impl AskBook {
    /// Create a new empty ask book
    pub fn new() -> Self {
        Self {
            levels: BTreeMap::new(),
        }
    }

    /// Insert an order into the ask book
    pub fn insert(&mut self, price: Price, order_id: OrderId, user_id: UserId, remaining: Quantity) {
        let level = self.levels.entry(price).or_insert_with(PriceLevel::new);
        level.insert(order_id, user_id, remaining);
    }

    /// Remove an order from the ask book
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

    /// Get the best ask (lowest price) with its aggregate quantity
    pub fn best_ask(&self) -> Option<(Price, Quantity)> {
        // BTreeMap iter is ascending, so first() gives us lowest price
        self.levels
            .iter()
            .next()
            .map(|(price, level)| (*price, level.total_quantity()))
    }

    /// Get the best ask price
    pub fn best_ask_price(&self) -> Option<Price> {
        self.levels.keys().next().copied()
    }

    /// Best resting ask not owned by `user`, in price-time priority order
    ///
    /// Scans levels from the lowest price up, skipping the user's own
    /// orders (which stay resting) until a counterparty is found.
    pub fn best_counterparty(&self, user: &UserId) -> Option<(Price, OrderId, UserId, Quantity)> {
        self.levels.iter().find_map(|(price, level)| {
            level
                .first_counterparty(user)
                .map(|(order_id, user_id, qty)| (*price, order_id, user_id, qty))
        })
    }

    /// Total quantity not owned by `user` at prices crossing `limit`
    ///
    /// An ask crosses a buy limit when its price is <= the limit; `None`
    /// (unbounded taker) counts every level.
    pub fn crossable_quantity(&self, user: &UserId, limit: Option<Price>) -> Decimal {
        self.levels
            .iter()
            .take_while(|(price, _)| limit.map_or(true, |l| **price <= l))
            .map(|(_, level)| level.counterparty_quantity(user))
            .sum()
    }

    /// Iterate all entries in price-time priority order
    pub fn entries(&self) -> impl Iterator<Item = (Price, OrderId, UserId, Quantity)> + '_ {
        self.levels.iter().flat_map(|(price, level)| {
            level
                .iter()
                .map(move |entry| (*price, entry.order_id, entry.user_id, entry.remaining))
        })
    }

    /// Get depth snapshot (top N price levels, aggregated)
    pub fn depth_snapshot(&self, depth: usize) -> Vec<BookLevel> {
        self.levels
            .iter()
            .take(depth)
            .map(|(price, level)| BookLevel {
                price: *price,
                quantity: level.total_quantity(),
                orders: level.order_count(),
            })
            .collect()
    }

    /// Check if the ask book is empty
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Get the total number of price levels
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insert_ask(book: &mut AskBook, price: u64, qty: &str) -> OrderId {
        let id = OrderId::new();
        book.insert(
            Price::from_u64(price),
            id,
            UserId::new(),
            Quantity::from_str(qty).unwrap(),
        );
        id
    }

    #[test]
    fn test_ask_book_best_ask() {
        let mut book = AskBook::new();

        insert_ask(&mut book, 50000, "1.0");
        insert_ask(&mut book, 51000, "2.0");
        insert_ask(&mut book, 49000, "1.5"); // Lowest price

        let (best_price, best_qty) = book.best_ask().unwrap();
        assert_eq!(best_price, Price::from_u64(49000));
        assert_eq!(best_qty, Quantity::from_str("1.5").unwrap());
    }

    #[test]
    fn test_ask_book_remove() {
        let mut book = AskBook::new();
        let order_id = insert_ask(&mut book, 50000, "1.0");

        assert!(book.remove(&order_id, Price::from_u64(50000)));
        assert!(book.is_empty());
        assert!(!book.remove(&order_id, Price::from_u64(50000)));
    }

    #[test]
    fn test_ask_book_best_counterparty_skips_own_level() {
        let mut book = AskBook::new();
        let own_user = UserId::new();
        book.insert(
            Price::from_u64(49000),
            OrderId::new(),
            own_user,
            Quantity::from_str("1.0").unwrap(),
        );
        let other = insert_ask(&mut book, 50000, "2.0");

        let (price, order_id, _, _) = book.best_counterparty(&own_user).unwrap();
        assert_eq!(price, Price::from_u64(50000));
        assert_eq!(order_id, other);
    }

    #[test]
    fn test_ask_book_crossable_quantity() {
        let mut book = AskBook::new();
        let user = UserId::new();

        insert_ask(&mut book, 49000, "1.0");
        insert_ask(&mut book, 50000, "2.0");
        insert_ask(&mut book, 51000, "4.0");

        // Buy limit at 50000 crosses the 49000 and 50000 levels only
        let crossable = book.crossable_quantity(&user, Some(Price::from_u64(50000)));
        assert_eq!(crossable, Decimal::from(3));

        let all = book.crossable_quantity(&user, None);
        assert_eq!(all, Decimal::from(7));
    }

    #[test]
    fn test_ask_book_depth_snapshot() {
        let mut book = AskBook::new();

        insert_ask(&mut book, 50000, "1.0");
        insert_ask(&mut book, 51000, "2.0");
        insert_ask(&mut book, 49000, "1.5");

        let depth = book.depth_snapshot(2);

        // Top 2 levels, lowest prices first
        assert_eq!(depth.len(), 2);
        assert_eq!(depth[0].price, Price::from_u64(49000));
        assert_eq!(depth[1].price, Price::from_u64(50000));
    }

    #[test]
    fn test_ask_book_entries_priority_order() {
        let mut book = AskBook::new();
        let first_at_best = insert_ask(&mut book, 49000, "1.0");
        insert_ask(&mut book, 50000, "1.0");

        let entries: Vec<_> = book.entries().collect();
        assert_eq!(entries[0].1, first_at_best);
        assert_eq!(entries[1].0, Price::from_u64(50000));
    }
}
