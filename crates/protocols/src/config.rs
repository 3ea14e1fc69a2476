//! Chain, contract and token configuration.

use clmm_keeper_domain::token::Token;
use serde::{Deserialize, Serialize};

/// Where the managed pool lives and how to talk to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    pub chain_id: u64,
    /// Default JSON-RPC endpoint; `RPC_URL` overrides it.
    pub rpc_url: String,
    pub pool_address: String,
    pub manager_address: String,
    /// token0 of the pool, the asset whose price is quoted.
    pub base_token: Token,
    /// token1 of the pool.
    pub quote_token: Token,
    /// Tokens claimed through `getReward` on exit.
    pub reward_tokens: Vec<String>,
    pub fee_tier: u32,
    /// Minimum human-readable balances required before minting.
    pub min_base_balance: f64,
    pub min_quote_balance: f64,
    /// Share of each balance deposited on mint, in thousandths.
    pub deposit_per_mille: u64,
    pub deadline_secs: i64,
    pub mint_gas_limit: u64,
    /// Swap aggregator base URL, including the chain id.
    pub aggregator_url: String,
    pub swap_slippage_pct: f64,
    /// Decimal places the swap amount is rounded to before conversion.
    pub swap_amount_places: u32,
    pub call_timeout_secs: u64,
    pub confirmation_timeout_secs: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: 42161,
            rpc_url: "https://arb1.arbitrum.io/rpc".to_string(),
            pool_address: "0x05ba720fc96ea8969f86d7a0b0767bb8dc265232".to_string(),
            manager_address: "0xaa277cb7914b7e5514946da92cb9de332ce610ef".to_string(),
            base_token: Token::new("0x6985884c4392d348587b19cb9eaaf157f13271cd", "ZRO", 18),
            quote_token: Token::new("0x82af49447d8a07e3bd95bd0d56f35241523fbab1", "WETH", 18),
            reward_tokens: vec![
                "0xAAA6C1E32C55A7Bfa8066A6FAE9b42650F262418".to_string(),
                "0x912ce59144191c1204e64559fe8253a0e49e6548".to_string(),
            ],
            fee_tier: 10_000,
            min_base_balance: 100.0,
            min_quote_balance: 0.1,
            deposit_per_mille: 999,
            deadline_secs: 60,
            mint_gas_limit: 1_000_000,
            aggregator_url: "https://api.1inch.dev/swap/v6.0/42161".to_string(),
            swap_slippage_pct: 1.0,
            swap_amount_places: 6,
            call_timeout_secs: 30,
            confirmation_timeout_secs: 180,
        }
    }
}
