//! Balance ledger interface
//!
//! The ledger is the sole owner of user balances; the core only asks it
//! to reserve, release, and settle. Reservations accepted at order entry
//! are authoritative: a settlement against them must not fail, and a
//! failure there is an integration bug, not a user error.
//!
//! [`MemoryLedger`] is a reference implementation for tests and
//! in-process embedders.

use std::collections::HashMap;
use std::sync::Mutex;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::balance::Balance;
use types::errors::LedgerError;
use types::ids::{Symbol, UserId};

/// Instruction for one atomic two-party transfer net of fees
///
/// The buyer's locked quote covers `quote_amount + buyer_fee`; the
/// seller's locked base covers `base_amount`. The seller receives
/// `quote_amount - seller_fee`; both fees accrue to the venue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub symbol: Symbol,
    pub buy_user_id: UserId,
    pub sell_user_id: UserId,
    /// Base quantity delivered to the buyer
    pub base_amount: Decimal,
    /// Quote value of the trade (price × quantity)
    pub quote_amount: Decimal,
    /// Buyer's fee, quote currency
    pub buyer_fee: Decimal,
    /// Seller's fee, quote currency
    pub seller_fee: Decimal,
}

/// External balance ledger consumed by the matching core
///
/// `release` must tolerate being asked for slightly more than is locked
/// (idempotent-on-error release of a reservation's unused portion).
pub trait BalanceLedger: Send + Sync {
    /// Move funds from available to locked for an order reservation
    fn reserve(&self, user_id: UserId, currency: &str, amount: Decimal) -> Result<(), LedgerError>;

    /// Return a reservation's unused portion to available
    fn release(&self, user_id: UserId, currency: &str, amount: Decimal) -> Result<(), LedgerError>;

    /// Atomically transfer both legs of a trade net of fees
    fn settle(&self, settlement: &Settlement) -> Result<(), LedgerError>;
}

#[derive(Default)]
struct MemoryLedgerState {
    accounts: HashMap<UserId, HashMap<String, Balance>>,
    collected_fees: HashMap<String, Decimal>,
}

/// In-memory ledger backed by [`types::balance::Balance`]
///
/// Thread-safe; one mutex guards all accounts, which makes `settle`
/// trivially atomic across the two parties.
#[derive(Default)]
pub struct MemoryLedger {
    state: Mutex<MemoryLedgerState>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit available funds to a user (test and bootstrap helper)
    pub fn deposit(&self, user_id: UserId, currency: &str, amount: Decimal) {
        let mut state = self.state.lock().expect("ledger lock poisoned");
        state
            .accounts
            .entry(user_id)
            .or_default()
            .entry(currency.to_string())
            .or_insert_with(|| Balance::new(currency, Decimal::ZERO))
            .credit(amount);
    }

    /// Current balance for a user and currency
    pub fn balance(&self, user_id: UserId, currency: &str) -> Option<Balance> {
        let state = self.state.lock().expect("ledger lock poisoned");
        state
            .accounts
            .get(&user_id)
            .and_then(|balances| balances.get(currency))
            .cloned()
    }

    /// Fees accrued to the venue in a currency
    pub fn collected_fees(&self, currency: &str) -> Decimal {
        let state = self.state.lock().expect("ledger lock poisoned");
        state
            .collected_fees
            .get(currency)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }
}

impl MemoryLedgerState {
    fn balance_mut(&mut self, user_id: UserId, currency: &str) -> &mut Balance {
        self.accounts
            .entry(user_id)
            .or_default()
            .entry(currency.to_string())
            .or_insert_with(|| Balance::new(currency, Decimal::ZERO))
    }

    fn locked(&self, user_id: UserId, currency: &str) -> Decimal {
        self.accounts
            .get(&user_id)
            .and_then(|balances| balances.get(currency))
            .map(|b| b.locked)
            .unwrap_or(Decimal::ZERO)
    }
}

impl BalanceLedger for MemoryLedger {
    fn reserve(&self, user_id: UserId, currency: &str, amount: Decimal) -> Result<(), LedgerError> {
        let mut state = self.state.lock().expect("ledger lock poisoned");
        state.balance_mut(user_id, currency).lock(amount)
    }

    fn release(&self, user_id: UserId, currency: &str, amount: Decimal) -> Result<(), LedgerError> {
        let mut state = self.state.lock().expect("ledger lock poisoned");
        let balance = state.balance_mut(user_id, currency);
        // Tolerate over-release: clamp to what is actually locked.
        let releasable = amount.min(balance.locked);
        balance.unlock(releasable)
    }

    fn settle(&self, s: &Settlement) -> Result<(), LedgerError> {
        let base = s.symbol.base().to_string();
        let quote = s.symbol.quote().to_string();
        let buyer_cost = s.quote_amount + s.buyer_fee;

        let mut state = self.state.lock().expect("ledger lock poisoned");

        // Verify both legs before mutating either, so a failed settlement
        // leaves no partial transfer behind.
        let buyer_locked = state.locked(s.buy_user_id, &quote);
        if buyer_locked < buyer_cost {
            return Err(LedgerError::InsufficientLocked {
                currency: quote,
                required: buyer_cost,
                locked: buyer_locked,
            });
        }
        let seller_locked = state.locked(s.sell_user_id, &base);
        if seller_locked < s.base_amount {
            return Err(LedgerError::InsufficientLocked {
                currency: base,
                required: s.base_amount,
                locked: seller_locked,
            });
        }

        // Buyer: pay quote from the reservation, receive base in full
        state.balance_mut(s.buy_user_id, &quote).spend_locked(buyer_cost)?;
        state.balance_mut(s.buy_user_id, &base).credit(s.base_amount);

        // Seller: deliver base from the reservation, receive quote net of fee
        state.balance_mut(s.sell_user_id, &base).spend_locked(s.base_amount)?;
        state
            .balance_mut(s.sell_user_id, &quote)
            .credit(s.quote_amount - s.seller_fee);

        *state.collected_fees.entry(quote).or_insert(Decimal::ZERO) +=
            s.buyer_fee + s.seller_fee;

        Ok(())
    }
}
