//! Order book infrastructure module
//!
//! Contains price levels, bid book, and ask book implementations. The
//! books are indexes over the engine's authoritative order store; all
//! business invariants live in the lifecycle and matching code, which
//! are the only mutators.

pub mod ask_book;
pub mod bid_book;
pub mod price_level;

pub use ask_book::AskBook;
pub use bid_book::BidBook;
pub use price_level::PriceLevel;

use serde::{Deserialize, Serialize};
use types::numeric::{Price, Quantity};

/// One aggregated price level in a depth snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: Price,
    /// Aggregate resting quantity at this price
    pub quantity: Quantity,
    /// Number of resting orders at this price
    pub orders: usize,
}
