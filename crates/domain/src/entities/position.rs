use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a position NFT minted by the position manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenId(pub U256);

impl TokenId {
    pub fn new(id: impl Into<U256>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// On-chain state of the owned position as last read from the position manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionState {
    pub token_id: TokenId,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub liquidity: u128,
}

impl PositionState {
    /// Whether `tick` lies within the position bounds widened by `buffer` ticks on each side.
    pub fn in_extended_range(&self, tick: i32, buffer: i32) -> bool {
        let lower = self.tick_lower.saturating_sub(buffer);
        let upper = self.tick_upper.saturating_add(buffer);
        tick >= lower && tick <= upper
    }
}
