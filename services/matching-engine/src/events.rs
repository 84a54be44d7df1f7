//! Lifecycle event emission
//!
//! The core notifies an injected [`EventSink`] at each order and trade
//! transition. Delivery is fire-and-forget: the core never waits for an
//! acknowledgement, and a lost notification must never roll back a
//! committed trade.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use types::order::Order;
use types::trade::Trade;

/// Everything the surrounding service can observe, as full records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum EngineEvent {
    /// Order accepted and opened
    OrderCreated(Order),
    /// Order fill or partial fill (carries the updated order)
    OrderUpdated(Order),
    /// Order cancelled by the user or by time-in-force policy
    OrderCancelled(Order),
    /// A match settled
    TradeExecuted(Trade),
}

/// Receiver for engine events, owned by the surrounding service
pub trait EventSink: Send + Sync {
    fn notify(&self, event: EngineEvent);
}

/// Sink that drops every event
#[derive(Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn notify(&self, _event: EngineEvent) {}
}

/// Sink that captures events for inspection in tests
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<EngineEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything received so far
    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.lock().expect("sink lock poisoned").clone()
    }

    /// Drain and return everything received so far
    pub fn take(&self) -> Vec<EngineEvent> {
        std::mem::take(&mut *self.events.lock().expect("sink lock poisoned"))
    }

    /// Count of trade events received
    pub fn trade_count(&self) -> usize {
        self.events
            .lock()
            .expect("sink lock poisoned")
            .iter()
            .filter(|e| matches!(e, EngineEvent::TradeExecuted(_)))
            .count()
    }
}

impl EventSink for RecordingSink {
    fn notify(&self, event: EngineEvent) {
        self.events.lock().expect("sink lock poisoned").push(event);
    }
}
