//! Position-id cache.
//!
//! The cache only saves a lookup. A cached id is always revalidated against
//! the position manager before it is acted upon, and any lookup miss evicts it.

use clmm_keeper_domain::entities::TokenId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Last known position id per wallet.
#[derive(Debug, Clone, Default)]
pub struct PositionCache {
    entries: Arc<RwLock<HashMap<String, TokenId>>>,
}

impl PositionCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, wallet: &str) -> Option<TokenId> {
        self.entries.read().await.get(&wallet.to_lowercase()).copied()
    }

    pub async fn set(&self, wallet: &str, token_id: TokenId) {
        let previous = self
            .entries
            .write()
            .await
            .insert(wallet.to_lowercase(), token_id);
        if previous != Some(token_id) {
            debug!(wallet, token_id = %token_id, "Position cached");
        }
    }

    pub async fn invalidate(&self, wallet: &str) {
        if let Some(token_id) = self.entries.write().await.remove(&wallet.to_lowercase()) {
            debug!(wallet, token_id = %token_id, "Position evicted");
        }
    }
}
