//! Engine configuration

use serde::{Deserialize, Serialize};
use types::fee::FeeSchedule;
use types::ids::Symbol;
use types::numeric::Quantity;

/// Static configuration for a matching engine instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Supported trading pairs; submissions for anything else are rejected
    pub symbols: Vec<Symbol>,
    /// Minimum lot size accepted by validation
    pub min_order_size: Quantity,
    /// Fixed maker/taker rates
    pub fees: FeeSchedule,
}

impl EngineConfig {
    /// Configuration for a given set of trading pairs with default
    /// minimum lot size and fees
    pub fn new(symbols: Vec<Symbol>) -> Self {
        Self {
            symbols,
            ..Self::default()
        }
    }

    /// Check if a symbol is in the supported set
    pub fn supports(&self, symbol: &Symbol) -> bool {
        self.symbols.contains(symbol)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            symbols: [
                "BTC/USDT", "ETH/USDT", "ETH/BTC", "LINK/USDT", "UNI/USDT",
                "BTC/USDC", "ETH/USDC", "DAI/USDT", "LINK/ETH", "UNI/ETH",
            ]
            .into_iter()
            .map(Symbol::new)
            .collect(),
            min_order_size: Quantity::from_str("0.0001").unwrap_or_else(|_| Quantity::zero()),
            fees: FeeSchedule::default(),
        }
    }
}
