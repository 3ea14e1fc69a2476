use super::contracts::INonfungiblePositionManager::{
    self, CollectParams, DecreaseLiquidityParams, MintParams,
};
use super::convert::{parse_address, tick_from_i32, to_alloy, unix_deadline};
use crate::config::ChainConfig;
use crate::error::{ProtocolError, Result};
use crate::types::{ExitRequest, MintRequest};
use alloy_primitives::aliases::U24;
use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolCall;

/// Builds position-manager calls for the configured pool.
#[derive(Debug, Clone)]
pub struct ManagerCalls {
    wallet: Address,
    token0: Address,
    token1: Address,
    fee: U24,
    reward_tokens: Vec<Address>,
}

impl ManagerCalls {
    pub fn new(config: &ChainConfig, wallet: Address) -> Result<Self> {
        let fee = U24::try_from(config.fee_tier)
            .map_err(|e| ProtocolError::config("chain.fee_tier", e))?;
        let reward_tokens = config
            .reward_tokens
            .iter()
            .map(|t| parse_address("chain.reward_tokens", t))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            wallet,
            token0: parse_address("chain.base_token", &config.base_token.address)?,
            token1: parse_address("chain.quote_token", &config.quote_token.address)?,
            fee,
            reward_tokens,
        })
    }

    /// Mint parameters with zero minimum amounts and the wallet as recipient.
    pub fn mint_params(&self, request: &MintRequest) -> Result<MintParams> {
        Ok(MintParams {
            token0: self.token0,
            token1: self.token1,
            fee: self.fee,
            tickLower: tick_from_i32(request.tick_lower)?,
            tickUpper: tick_from_i32(request.tick_upper)?,
            amount0Desired: to_alloy(request.amount0.raw),
            amount1Desired: to_alloy(request.amount1.raw),
            amount0Min: U256::ZERO,
            amount1Min: U256::ZERO,
            recipient: self.wallet,
            deadline: unix_deadline(request.deadline),
            veRamTokenId: U256::ZERO,
        })
    }

    /// The exit batch: decrease all liquidity, collect everything to the
    /// manager, sweep both tokens to the wallet, claim rewards, burn.
    ///
    /// An empty position skips the decrease, which would revert on zero liquidity.
    pub fn exit_batch(&self, request: &ExitRequest) -> Vec<Bytes> {
        let token_id = to_alloy(request.token_id.0);
        let mut calls = Vec::with_capacity(6);

        if request.liquidity > 0 {
            calls.push(
                INonfungiblePositionManager::decreaseLiquidityCall {
                    params: DecreaseLiquidityParams {
                        tokenId: token_id,
                        liquidity: request.liquidity,
                        amount0Min: U256::ZERO,
                        amount1Min: U256::ZERO,
                        deadline: unix_deadline(request.deadline),
                    },
                }
                .abi_encode(),
            );
        }
        calls.push(
            INonfungiblePositionManager::collectCall {
                params: CollectParams {
                    tokenId: token_id,
                    recipient: Address::ZERO,
                    amount0Max: u128::MAX,
                    amount1Max: u128::MAX,
                },
            }
            .abi_encode(),
        );
        for token in [self.token0, self.token1] {
            calls.push(
                INonfungiblePositionManager::sweepTokenCall {
                    token,
                    amountMinimum: U256::ZERO,
                    recipient: self.wallet,
                }
                .abi_encode(),
            );
        }
        if !self.reward_tokens.is_empty() {
            calls.push(
                INonfungiblePositionManager::getRewardCall {
                    tokenId: token_id,
                    tokens: self.reward_tokens.clone(),
                }
                .abi_encode(),
            );
        }
        calls.push(INonfungiblePositionManager::burnCall { tokenId: token_id }.abi_encode());

        calls.into_iter().map(Bytes::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use clmm_keeper_domain::entities::TokenId;
    use clmm_keeper_domain::token::Amount;
    use primitive_types::U256 as PU256;

    fn calls() -> ManagerCalls {
        let wallet = Address::repeat_byte(0x11);
        ManagerCalls::new(&ChainConfig::default(), wallet).unwrap()
    }

    fn selector(call: &Bytes) -> [u8; 4] {
        [call[0], call[1], call[2], call[3]]
    }

    #[test]
    fn test_exit_batch_order() {
        let batch = calls().exit_batch(&ExitRequest {
            token_id: TokenId::new(42u64),
            liquidity: 1_000,
            deadline: Utc::now(),
        });
        let selectors: Vec<[u8; 4]> = batch.iter().map(selector).collect();
        assert_eq!(
            selectors,
            vec![
                INonfungiblePositionManager::decreaseLiquidityCall::SELECTOR,
                INonfungiblePositionManager::collectCall::SELECTOR,
                INonfungiblePositionManager::sweepTokenCall::SELECTOR,
                INonfungiblePositionManager::sweepTokenCall::SELECTOR,
                INonfungiblePositionManager::getRewardCall::SELECTOR,
                INonfungiblePositionManager::burnCall::SELECTOR,
            ]
        );
    }

    #[test]
    fn test_empty_position_skips_decrease() {
        let batch = calls().exit_batch(&ExitRequest {
            token_id: TokenId::new(42u64),
            liquidity: 0,
            deadline: Utc::now(),
        });
        assert_eq!(batch.len(), 5);
        assert_eq!(
            selector(&batch[0]),
            INonfungiblePositionManager::collectCall::SELECTOR
        );
    }

    #[test]
    fn test_mint_params() {
        let params = calls()
            .mint_params(&MintRequest {
                tick_lower: -400,
                tick_upper: 200,
                amount0: Amount::new(PU256::from(999u64), 18),
                amount1: Amount::new(PU256::from(5u64), 18),
                deadline: Utc::now(),
            })
            .unwrap();
        assert_eq!(params.amount0Desired, U256::from(999u64));
        assert_eq!(params.amount0Min, U256::ZERO);
        assert_eq!(params.recipient, Address::repeat_byte(0x11));
        assert_eq!(params.fee, U24::from(10_000u32));
    }

    #[test]
    fn test_bad_reward_token_is_configuration_error() {
        let config = ChainConfig {
            reward_tokens: vec!["0xnope".into()],
            ..Default::default()
        };
        assert!(matches!(
            ManagerCalls::new(&config, Address::ZERO),
            Err(ProtocolError::Configuration { .. })
        ));
    }
}
