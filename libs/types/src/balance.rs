//! Per-asset balance with a reserved (locked) bucket
//!
//! Backing type for ledger implementations. The invariant
//! `total = available + locked` holds across every operation; the locked
//! bucket models outstanding order reservations.

use crate::errors::LedgerError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Balance for a single asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub asset: String,
    pub total: Decimal,
    pub available: Decimal,
    pub locked: Decimal,
}

impl Balance {
    /// Create a new balance with everything available
    pub fn new(asset: impl Into<String>, total: Decimal) -> Self {
        Self {
            asset: asset.into(),
            total,
            available: total,
            locked: Decimal::ZERO,
        }
    }

    /// Check balance invariant: total = available + locked
    pub fn check_invariant(&self) -> bool {
        self.total == self.available + self.locked
    }

    /// Move funds from available to locked (order reservation)
    pub fn lock(&mut self, amount: Decimal) -> Result<(), LedgerError> {
        if amount > self.available {
            return Err(LedgerError::InsufficientFunds {
                currency: self.asset.clone(),
                required: amount,
                available: self.available,
            });
        }

        self.available -= amount;
        self.locked += amount;

        debug_assert!(self.check_invariant());
        Ok(())
    }

    /// Move funds from locked back to available (reservation release)
    pub fn unlock(&mut self, amount: Decimal) -> Result<(), LedgerError> {
        if amount > self.locked {
            return Err(LedgerError::InsufficientLocked {
                currency: self.asset.clone(),
                required: amount,
                locked: self.locked,
            });
        }

        self.locked -= amount;
        self.available += amount;

        debug_assert!(self.check_invariant());
        Ok(())
    }

    /// Consume locked funds (trade settlement)
    pub fn spend_locked(&mut self, amount: Decimal) -> Result<(), LedgerError> {
        if amount > self.locked {
            return Err(LedgerError::InsufficientLocked {
                currency: self.asset.clone(),
                required: amount,
                locked: self.locked,
            });
        }

        self.locked -= amount;
        self.total -= amount;

        debug_assert!(self.check_invariant());
        Ok(())
    }

    /// Credit to available balance (deposit, trade proceeds)
    pub fn credit(&mut self, amount: Decimal) {
        self.available += amount;
        self.total += amount;

        debug_assert!(self.check_invariant());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balance_creation() {
        let balance = Balance::new("USDT", Decimal::from(10000));
        assert_eq!(balance.total, Decimal::from(10000));
        assert_eq!(balance.available, Decimal::from(10000));
        assert_eq!(balance.locked, Decimal::ZERO);
        assert!(balance.check_invariant());
    }

    #[test]
    fn test_balance_lock() {
        let mut balance = Balance::new("USDT", Decimal::from(10000));
        balance.lock(Decimal::from(3000)).unwrap();

        assert_eq!(balance.total, Decimal::from(10000));
        assert_eq!(balance.available, Decimal::from(7000));
        assert_eq!(balance.locked, Decimal::from(3000));
        assert!(balance.check_invariant());
    }

    #[test]
    fn test_balance_unlock() {
        let mut balance = Balance::new("USDT", Decimal::from(10000));
        balance.lock(Decimal::from(3000)).unwrap();
        balance.unlock(Decimal::from(1000)).unwrap();

        assert_eq!(balance.available, Decimal::from(8000));
        assert_eq!(balance.locked, Decimal::from(2000));
        assert!(balance.check_invariant());
    }

    #[test]
    fn test_balance_spend_locked() {
        let mut balance = Balance::new("USDT", Decimal::from(10000));
        balance.lock(Decimal::from(3000)).unwrap();
        balance.spend_locked(Decimal::from(1000)).unwrap();

        assert_eq!(balance.total, Decimal::from(9000));
        assert_eq!(balance.locked, Decimal::from(2000));
        assert!(balance.check_invariant());
    }

    #[test]
    fn test_balance_credit() {
        let mut balance = Balance::new("USDT", Decimal::from(10000));
        balance.credit(Decimal::from(5000));

        assert_eq!(balance.total, Decimal::from(15000));
        assert_eq!(balance.available, Decimal::from(15000));
        assert!(balance.check_invariant());
    }

    #[test]
    fn test_balance_overlock_fails() {
        let mut balance = Balance::new("USDT", Decimal::from(10000));
        let err = balance.lock(Decimal::from(15000)).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
        // Failed lock must not mutate anything
        assert_eq!(balance.available, Decimal::from(10000));
        assert!(balance.check_invariant());
    }

    #[test]
    fn test_balance_overspend_fails() {
        let mut balance = Balance::new("USDT", Decimal::from(10000));
        balance.lock(Decimal::from(100)).unwrap();
        let err = balance.spend_locked(Decimal::from(200)).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientLocked { .. }));
        assert_eq!(balance.locked, Decimal::from(100));
    }
}
