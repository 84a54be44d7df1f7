//! Crossing detection logic
//!
//! Determines when two orders can match based on price compatibility.

use types::numeric::Price;
use types::order::Side;

/// Check if a resting bid and a resting ask can match at given prices
///
/// For a buy order to match with a sell order the buy price must be >=
/// the sell price.
pub fn can_match(bid_price: Price, ask_price: Price) -> bool {
    bid_price >= ask_price
}

/// Check if a taker crosses a resting order's price
///
/// `taker_limit` is the taker's limit price, or the protection bound of
/// a market order; `None` means unbounded (a market order with no bound)
/// and crosses everything.
pub fn taker_crosses(taker_side: Side, taker_limit: Option<Price>, resting_price: Price) -> bool {
    let Some(limit) = taker_limit else {
        return true;
    };
    match taker_side {
        Side::Buy => limit >= resting_price,  // buy crosses sell if bid >= ask
        Side::Sell => limit <= resting_price, // sell crosses buy if ask <= bid
    }
}
