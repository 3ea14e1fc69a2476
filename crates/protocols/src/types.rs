//! Requests and results exchanged with the collaborators.

use chrono::{DateTime, Utc};
use clmm_keeper_domain::entities::TokenId;
use clmm_keeper_domain::token::{Amount, Token};
use primitive_types::U256;
use serde::{Deserialize, Serialize};

/// Current price slot of the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSlot {
    pub sqrt_price_x96: U256,
    pub tick: i32,
}

/// Liquidity to deposit into a new position. Tokens, fee tier and recipient
/// come from the adapter's configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintRequest {
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub amount0: Amount,
    pub amount1: Amount,
    pub deadline: DateTime<Utc>,
}

/// Full removal of a position: withdraw, collect, sweep, claim rewards, burn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitRequest {
    pub token_id: TokenId,
    pub liquidity: u128,
    pub deadline: DateTime<Utc>,
}

/// Receipt of a confirmed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub hash: String,
    pub block_number: Option<u64>,
}

/// Swap quote request sent to the aggregator.
#[derive(Debug, Clone, PartialEq)]
pub struct SwapRequest {
    pub src: Token,
    pub dst: Token,
    /// Raw amount of `src` to sell.
    pub amount: Amount,
    /// Wallet that signs and funds the swap.
    pub from: String,
    /// Maximum slippage in percent (1 = 1%).
    pub slippage_pct: f64,
    pub disable_estimate: bool,
    pub allow_partial_fill: bool,
}

impl SwapRequest {
    /// Query string parameters of the aggregator's swap endpoint.
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("src", self.src.address.clone()),
            ("dst", self.dst.address.clone()),
            ("amount", self.amount.raw.to_string()),
            ("from", self.from.clone()),
            ("slippage", self.slippage_pct.to_string()),
            ("disableEstimate", self.disable_estimate.to_string()),
            ("allowPartialFill", self.allow_partial_fill.to_string()),
        ]
    }
}

/// Unsigned transaction returned by the aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapTransaction {
    pub from: String,
    pub to: String,
    /// Hex-encoded calldata.
    pub data: String,
    pub value: U256,
    pub gas: Option<u64>,
    pub gas_price: Option<U256>,
}
