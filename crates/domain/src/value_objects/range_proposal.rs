use serde::{Deserialize, Serialize};

/// Tick range and capital split derived from a single pool price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeProposal {
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub lower_price_bound: f64,
    pub upper_price_bound: f64,
    /// Fraction of value to hold above the current price, already clamped.
    pub proportion: f64,
    /// Decoded pool price, quote units per base unit.
    pub reference_price: f64,
}

impl RangeProposal {
    pub fn width(&self) -> i32 {
        self.tick_upper - self.tick_lower
    }
}
