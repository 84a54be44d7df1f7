//! Price level implementation with FIFO queue
//!
//! A price level contains all orders resting at a specific price point.
//! Orders are maintained in FIFO (First-In-First-Out) order to enforce
//! time priority.

use rust_decimal::Decimal;
use std::collections::VecDeque;
use types::ids::{OrderId, UserId};
use types::numeric::Quantity;

/// A price level containing orders at a specific price
///
/// Maintains strict FIFO ordering for time-priority matching. Entries
/// carry the order id, owning user, and a cached remaining quantity; the
/// authoritative order state lives in the engine's order store.
#[derive(Debug, Clone, Default)]
pub struct PriceLevel {
    /// Queue of orders at this price level (FIFO order)
    orders: VecDeque<LevelEntry>,
    /// Total quantity available at this level
    total_quantity: Quantity,
}

/// Entry in the price level queue
#[derive(Debug, Clone)]
pub(crate) struct LevelEntry {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub remaining: Quantity,
}

impl PriceLevel {
    /// Create a new empty price level
    pub fn new() -> Self {
        Self {
            orders: VecDeque::new(),
            total_quantity: Quantity::zero(),
        }
    }

    /// Insert an order at the back of the queue (time priority)
    pub fn insert(&mut self, order_id: OrderId, user_id: UserId, quantity: Quantity) {
        self.orders.push_back(LevelEntry {
            order_id,
            user_id,
            remaining: quantity,
        });
        self.total_quantity = self.total_quantity + quantity;
    }

    /// Remove an order from the queue by OrderId
    ///
    /// Returns the remaining quantity of the removed order, or None if not found
    pub fn remove(&mut self, order_id: &OrderId) -> Option<Quantity> {
        let position = self.orders.iter().position(|entry| &entry.order_id == order_id)?;
        let entry = self.orders.remove(position)?;

        self.total_quantity = self.total_quantity.saturating_sub(entry.remaining);

        Some(entry.remaining)
    }

    /// First entry in FIFO order not owned by `user`
    ///
    /// The self-trade skip: a user's own resting orders are passed over
    /// and stay in the queue untouched.
    pub fn first_counterparty(&self, user: &UserId) -> Option<(OrderId, UserId, Quantity)> {
        self.orders
            .iter()
            .find(|entry| &entry.user_id != user)
            .map(|entry| (entry.order_id, entry.user_id, entry.remaining))
    }

    /// Total quantity at this level not owned by `user`
    pub fn counterparty_quantity(&self, user: &UserId) -> Decimal {
        self.orders
            .iter()
            .filter(|entry| &entry.user_id != user)
            .map(|entry| entry.remaining.as_decimal())
            .sum()
    }

    /// Reduce an entry's remaining quantity after a fill
    ///
    /// The entry is dropped from the queue once nothing remains.
    /// Returns false if the order is not at this level.
    pub fn reduce(&mut self, order_id: &OrderId, quantity: Quantity) -> bool {
        let Some(position) = self.orders.iter().position(|e| &e.order_id == order_id) else {
            return false;
        };

        let entry = &mut self.orders[position];
        entry.remaining = entry.remaining.saturating_sub(quantity);
        self.total_quantity = self.total_quantity.saturating_sub(quantity);

        if entry.remaining.is_zero() {
            self.orders.remove(position);
        }
        true
    }

    /// Iterate entries in FIFO order
    pub(crate) fn iter(&self) -> impl Iterator<Item = &LevelEntry> {
        self.orders.iter()
    }

    /// Check if the price level is empty
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Get the total quantity at this price level
    pub fn total_quantity(&self) -> Quantity {
        self.total_quantity
    }

    /// Get the number of orders at this level
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_level_insert() {
        let mut level = PriceLevel::new();
        let order_id = OrderId::new();
        let user_id = UserId::new();
        let qty = Quantity::from_str("1.5").unwrap();

        level.insert(order_id, user_id, qty);

        assert_eq!(level.order_count(), 1);
        assert_eq!(level.total_quantity(), qty);
        assert!(!level.is_empty());
    }

    #[test]
    fn test_price_level_fifo_order() {
        let mut level = PriceLevel::new();
        let user_a = UserId::new();
        let user_b = UserId::new();
        let order1 = OrderId::new();
        let order2 = OrderId::new();

        level.insert(order1, user_a, Quantity::from_str("1.0").unwrap());
        level.insert(order2, user_a, Quantity::from_str("2.0").unwrap());

        // Earliest insertion is first for any counterparty
        let (front_id, _, front_qty) = level.first_counterparty(&user_b).unwrap();
        assert_eq!(front_id, order1);
        assert_eq!(front_qty, Quantity::from_str("1.0").unwrap());
    }

    #[test]
    fn test_first_counterparty_skips_own_orders() {
        let mut level = PriceLevel::new();
        let user_a = UserId::new();
        let user_b = UserId::new();
        let own = OrderId::new();
        let other = OrderId::new();

        level.insert(own, user_a, Quantity::from_str("1.0").unwrap());
        level.insert(other, user_b, Quantity::from_str("2.0").unwrap());

        // user_a matching against this level must skip its own front order
        let (id, user, _) = level.first_counterparty(&user_a).unwrap();
        assert_eq!(id, other);
        assert_eq!(user, user_b);

        // and the skipped order is still resting
        assert_eq!(level.order_count(), 2);
    }

    #[test]
    fn test_first_counterparty_none_when_all_own() {
        let mut level = PriceLevel::new();
        let user = UserId::new();
        level.insert(OrderId::new(), user, Quantity::from_str("1.0").unwrap());

        assert!(level.first_counterparty(&user).is_none());
    }

    #[test]
    fn test_counterparty_quantity() {
        let mut level = PriceLevel::new();
        let user_a = UserId::new();
        let user_b = UserId::new();

        level.insert(OrderId::new(), user_a, Quantity::from_str("1.0").unwrap());
        level.insert(OrderId::new(), user_b, Quantity::from_str("2.0").unwrap());
        level.insert(OrderId::new(), user_b, Quantity::from_str("0.5").unwrap());

        assert_eq!(
            level.counterparty_quantity(&user_a),
            Decimal::from_str_exact("2.5").unwrap()
        );
    }

    #[test]
    fn test_price_level_remove() {
        let mut level = PriceLevel::new();
        let user = UserId::new();
        let order1 = OrderId::new();
        let order2 = OrderId::new();

        level.insert(order1, user, Quantity::from_str("1.0").unwrap());
        level.insert(order2, user, Quantity::from_str("2.0").unwrap());

        let removed_qty = level.remove(&order1);
        assert_eq!(removed_qty, Some(Quantity::from_str("1.0").unwrap()));
        assert_eq!(level.order_count(), 1);
        assert_eq!(level.total_quantity(), Quantity::from_str("2.0").unwrap());
    }

    #[test]
    fn test_price_level_reduce_partial() {
        let mut level = PriceLevel::new();
        let order_id = OrderId::new();

        level.insert(order_id, UserId::new(), Quantity::from_str("5.0").unwrap());

        assert!(level.reduce(&order_id, Quantity::from_str("2.0").unwrap()));
        assert_eq!(level.total_quantity(), Quantity::from_str("3.0").unwrap());
        assert_eq!(level.order_count(), 1);
    }

    #[test]
    fn test_price_level_reduce_to_zero_removes() {
        let mut level = PriceLevel::new();
        let order_id = OrderId::new();

        level.insert(order_id, UserId::new(), Quantity::from_str("5.0").unwrap());

        assert!(level.reduce(&order_id, Quantity::from_str("5.0").unwrap()));
        assert!(level.is_empty());
        assert_eq!(level.total_quantity(), Quantity::zero());
    }

    #[test]
    fn test_price_level_reduce_unknown_order() {
        let mut level = PriceLevel::new();
        level.insert(OrderId::new(), UserId::new(), Quantity::from_str("1.0").unwrap());

        assert!(!level.reduce(&OrderId::new(), Quantity::from_str("1.0").unwrap()));
        assert_eq!(level.total_quantity(), Quantity::from_str("1.0").unwrap());
    }
}
