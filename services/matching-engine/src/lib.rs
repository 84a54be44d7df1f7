//! Venue matching core
//!
//! Order-matching library for a trading venue: per-symbol order books,
//! price-time priority matching, and the fund-reservation lifecycle that
//! keeps a user's tradable balance consistent with their open orders.
//!
//! The core is transport-agnostic and consumes exactly two externally
//! owned capabilities: a [`ledger::BalanceLedger`] that reserves,
//! releases, and settles funds, and an [`events::EventSink`] that
//! receives lifecycle notifications.
//!
//! **Key invariants:**
//! - Price-time priority strictly enforced
//! - Deterministic matching (same inputs → same outputs)
//! - No self-trades
//! - Conservation of quantity: `filled + remaining == amount`

pub mod book;
pub mod config;
pub mod engine;
pub mod events;
pub mod ledger;
pub mod lifecycle;
pub mod matching;

pub use config::EngineConfig;
pub use engine::{EngineStatus, MatchingEngine, OrderBookSnapshot};
pub use events::{EngineEvent, EventSink, NullSink, RecordingSink};
pub use ledger::{BalanceLedger, MemoryLedger, Settlement};
pub use lifecycle::OrderRequest;
