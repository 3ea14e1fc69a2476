use serde::{Deserialize, Serialize};
use std::fmt;

/// Which asset the rebalancing trade sells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeSide {
    /// Sell the base asset for quote.
    SellBase,
    /// Sell the quote asset for base.
    SellQuote,
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeSide::SellBase => write!(f, "sell-base"),
            TradeSide::SellQuote => write!(f, "sell-quote"),
        }
    }
}

/// A single-sided trade instruction. `amount` is in units of the asset being sold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradePlan {
    pub side: TradeSide,
    pub amount: f64,
}

impl TradePlan {
    pub fn is_empty(&self) -> bool {
        self.amount <= 0.0
    }
}
