//! JSON-RPC adapter for the pool, the position manager and the wallet.
//!
//! - Every read is bounded by the call timeout
//! - Every write waits for its receipt, bounded by the confirmation timeout
//! - A reverted receipt is an error, never a success

use super::calls::ManagerCalls;
use super::contracts::{IERC20, INonfungiblePositionManager, IRamsesPool};
use super::convert::{from_alloy, from_u160, parse_address, tick_to_i32, to_alloy};
use crate::config::ChainConfig;
use crate::error::{ProtocolError, Result};
use crate::types::{ExitRequest, MintRequest, PoolSlot, SwapTransaction, TxReceipt};
use crate::{PoolReader, PositionManager, TransactionSender, WalletBalances};
use alloy_primitives::{Address, Bytes, U256};
use alloy_provider::network::{
    Ethereum, EthereumWallet, Network, ReceiptResponse, TransactionBuilder,
};
use alloy_provider::{DynProvider, PendingTransactionBuilder, Provider, ProviderBuilder};
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use clmm_keeper_domain::entities::{PositionState, TokenId};
use clmm_keeper_domain::token::{Amount, Token};
use std::fmt::Display;
use std::future::IntoFuture;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Revert reasons that mean "no such position" rather than a failed read.
const MISSING_POSITION_REASONS: [&str; 2] = ["Invalid token ID", "index out of bounds"];

fn is_missing_position(reason: &str) -> bool {
    MISSING_POSITION_REASONS.iter().any(|r| reason.contains(r))
}

/// Signing client bound to one wallet, one pool and one position manager.
pub struct RamsesClient {
    provider: DynProvider,
    wallet: Address,
    pool: Address,
    manager: Address,
    calls: ManagerCalls,
    mint_gas_limit: u64,
    call_timeout: Duration,
    confirmation_timeout: Duration,
}

/// Parses the wallet key into a signer bound to `chain_id`.
fn chain_signer(private_key: &str, chain_id: u64) -> Result<PrivateKeySigner> {
    if private_key.trim().is_empty() {
        return Err(ProtocolError::config("PRIVATE_KEY", "must not be empty"));
    }
    Ok(PrivateKeySigner::from_str(private_key.trim())
        .map_err(|e| ProtocolError::config("PRIVATE_KEY", e))?
        .with_chain_id(Some(chain_id)))
}

impl RamsesClient {
    /// Connects a wallet-backed provider to `rpc_url`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the key, URL or any contract address
    /// does not parse.
    pub fn connect(config: &ChainConfig, rpc_url: &str, private_key: &str) -> Result<Self> {
        let signer = chain_signer(private_key, config.chain_id)?;
        let wallet = signer.address();
        let url: url::Url = rpc_url
            .parse()
            .map_err(|e: url::ParseError| ProtocolError::config("RPC_URL", e))?;

        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(url)
            .erased();

        info!(wallet = %wallet, chain_id = config.chain_id, "Connected wallet provider");

        Ok(Self {
            provider,
            wallet,
            pool: parse_address("chain.pool_address", &config.pool_address)?,
            manager: parse_address("chain.manager_address", &config.manager_address)?,
            calls: ManagerCalls::new(config, wallet)?,
            mint_gas_limit: config.mint_gas_limit,
            call_timeout: Duration::from_secs(config.call_timeout_secs),
            confirmation_timeout: Duration::from_secs(config.confirmation_timeout_secs),
        })
    }

    #[must_use]
    pub fn wallet_address(&self) -> Address {
        self.wallet
    }

    async fn read<T, E, F>(&self, operation: &'static str, call: F) -> Result<T>
    where
        E: Display,
        F: IntoFuture<Output = std::result::Result<T, E>>,
    {
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(ProtocolError::Read {
                operation,
                reason: e.to_string(),
            }),
            Err(_) => Err(ProtocolError::Timeout { operation }),
        }
    }

    async fn submit<E, F>(
        &self,
        operation: &'static str,
        send: F,
    ) -> Result<PendingTransactionBuilder<Ethereum>>
    where
        E: Display,
        F: IntoFuture<Output = std::result::Result<PendingTransactionBuilder<Ethereum>, E>>,
    {
        match tokio::time::timeout(self.call_timeout, send).await {
            Ok(Ok(pending)) => Ok(pending),
            Ok(Err(e)) => Err(ProtocolError::Write {
                operation,
                reason: e.to_string(),
            }),
            Err(_) => Err(ProtocolError::Timeout { operation }),
        }
    }

    /// Waits for the receipt of a submitted transaction.
    async fn confirm(
        &self,
        operation: &'static str,
        pending: PendingTransactionBuilder<Ethereum>,
    ) -> Result<TxReceipt> {
        let hash = format!("{:?}", pending.tx_hash());
        debug!(operation, hash = %hash, "Waiting for confirmation");

        let receipt = match tokio::time::timeout(self.confirmation_timeout, pending.get_receipt())
            .await
        {
            Ok(Ok(receipt)) => receipt,
            Ok(Err(e)) => {
                warn!(operation, hash = %hash, error = %e, "Receipt unavailable");
                return Err(ProtocolError::Unconfirmed { operation, hash });
            }
            Err(_) => {
                warn!(operation, hash = %hash, "Confirmation timed out");
                return Err(ProtocolError::Unconfirmed { operation, hash });
            }
        };

        into_receipt(operation, hash, &receipt)
    }
}

fn into_receipt<R: ReceiptResponse>(
    operation: &'static str,
    hash: String,
    receipt: &R,
) -> Result<TxReceipt> {
    if !receipt.status() {
        return Err(ProtocolError::Reverted { operation, hash });
    }
    info!(operation, hash = %hash, block = ?receipt.block_number(), "Transaction confirmed");
    Ok(TxReceipt {
        hash,
        block_number: receipt.block_number(),
    })
}

#[async_trait]
impl PoolReader for RamsesClient {
    async fn slot0(&self) -> Result<PoolSlot> {
        let pool = IRamsesPool::new(self.pool, &self.provider);
        let slot = self.read("slot0", pool.slot0().call()).await?;
        Ok(PoolSlot {
            sqrt_price_x96: from_u160(slot.sqrtPriceX96),
            tick: tick_to_i32(slot.tick)?,
        })
    }
}

#[async_trait]
impl PositionManager for RamsesClient {
    async fn owned_position(&self, owner: &str) -> Result<Option<TokenId>> {
        let owner = parse_address("owner", owner)?;
        let manager = INonfungiblePositionManager::new(self.manager, &self.provider);

        let count = self.read("balanceOf", manager.balanceOf(owner).call()).await?;
        if count.is_zero() {
            return Ok(None);
        }

        match self
            .read(
                "tokenOfOwnerByIndex",
                manager.tokenOfOwnerByIndex(owner, U256::ZERO).call(),
            )
            .await
        {
            Ok(id) => Ok(Some(TokenId(from_alloy(id)))),
            Err(ProtocolError::Read { reason, .. }) if is_missing_position(&reason) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn position(&self, token_id: TokenId) -> Result<Option<PositionState>> {
        let manager = INonfungiblePositionManager::new(self.manager, &self.provider);
        let position = match self
            .read("positions", manager.positions(to_alloy(token_id.0)).call())
            .await
        {
            Ok(position) => position,
            Err(ProtocolError::Read { reason, .. }) if is_missing_position(&reason) => {
                debug!(token_id = %token_id, "Position no longer exists");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        Ok(Some(PositionState {
            token_id,
            tick_lower: tick_to_i32(position.tickLower)?,
            tick_upper: tick_to_i32(position.tickUpper)?,
            liquidity: position.liquidity,
        }))
    }

    async fn mint(&self, request: &MintRequest) -> Result<TxReceipt> {
        let params = self.calls.mint_params(request)?;
        let manager = INonfungiblePositionManager::new(self.manager, &self.provider);
        let call = manager.mint(params).gas(self.mint_gas_limit);
        let pending = self.submit("mint", call.send()).await?;
        self.confirm("mint", pending).await
    }

    async fn exit(&self, request: &ExitRequest) -> Result<TxReceipt> {
        let batch = self.calls.exit_batch(request);
        let manager = INonfungiblePositionManager::new(self.manager, &self.provider);
        let call = manager.multicall(batch);
        let pending = self.submit("exit", call.send()).await?;
        self.confirm("exit", pending).await
    }
}

#[async_trait]
impl WalletBalances for RamsesClient {
    async fn balance_of(&self, token: &Token) -> Result<Amount> {
        let address = parse_address("token", &token.address)?;
        let erc20 = IERC20::new(address, &self.provider);
        let raw = self
            .read("token balance", erc20.balanceOf(self.wallet).call())
            .await?;
        Ok(token.amount(from_alloy(raw)))
    }
}

#[async_trait]
impl TransactionSender for RamsesClient {
    async fn send(&self, transaction: &SwapTransaction) -> Result<TxReceipt> {
        let to = parse_address("swap.to", &transaction.to)?;
        let input = Bytes::from_str(&transaction.data).map_err(|e| ProtocolError::Write {
            operation: "swap",
            reason: format!("calldata is not hex: {e}"),
        })?;

        let mut request = <Ethereum as Network>::TransactionRequest::default()
            .with_from(self.wallet)
            .with_to(to)
            .with_input(input)
            .with_value(to_alloy(transaction.value));
        if let Some(gas) = transaction.gas {
            request = request.with_gas_limit(gas);
        }
        if let Some(price) = transaction.gas_price {
            let price = u128::try_from(to_alloy(price)).map_err(|e| ProtocolError::Write {
                operation: "swap",
                reason: format!("gas price out of range: {e}"),
            })?;
            request = request.with_gas_price(price);
        }

        let pending = self
            .submit("swap", self.provider.send_transaction(request))
            .await?;
        self.confirm("swap", pending).await
    }
}
