//! Collaborators of the position controller.
//!
//! The controller only sees the traits below. Adapters:
//! - `ramses`: pool, position manager and wallet over JSON-RPC
//! - `oneinch`: swap aggregator over HTTP

/// Chain and token configuration.
pub mod config;
/// Protocol errors.
pub mod error;
/// Swap aggregator client.
pub mod oneinch;
/// Concentrated-liquidity pool and position manager adapter.
pub mod ramses;
/// Requests and receipts.
pub mod types;

pub use error::{ProtocolError, Result};
pub use types::{ExitRequest, MintRequest, PoolSlot, SwapRequest, SwapTransaction, TxReceipt};

use async_trait::async_trait;
use clmm_keeper_domain::entities::{PositionState, TokenId};
use clmm_keeper_domain::token::{Amount, Token};

/// Read access to the pool's price slot.
#[async_trait]
pub trait PoolReader: Send + Sync {
    async fn slot0(&self) -> Result<PoolSlot>;
}

/// The position-manager contract.
#[async_trait]
pub trait PositionManager: Send + Sync {
    /// First position owned by `owner`, or `None` when it owns none.
    async fn owned_position(&self, owner: &str) -> Result<Option<TokenId>>;

    /// Bounds and liquidity of a position, or `None` when the id no longer exists.
    async fn position(&self, token_id: TokenId) -> Result<Option<PositionState>>;

    async fn mint(&self, request: &MintRequest) -> Result<TxReceipt>;

    /// Removes a position completely in one batch.
    async fn exit(&self, request: &ExitRequest) -> Result<TxReceipt>;
}

/// Token balances of the managed wallet.
#[async_trait]
pub trait WalletBalances: Send + Sync {
    async fn balance_of(&self, token: &Token) -> Result<Amount>;
}

/// Quotes swaps as unsigned transactions.
#[async_trait]
pub trait SwapAggregator: Send + Sync {
    async fn build_swap(&self, request: &SwapRequest) -> Result<SwapTransaction>;
}

/// Signs, submits and confirms prepared transactions.
///
/// Swaps are broadcast by the wallet provider rather than the aggregator's broadcast endpoint.
#[async_trait]
pub trait TransactionSender: Send + Sync {
    async fn send(&self, transaction: &SwapTransaction) -> Result<TxReceipt>;
}
