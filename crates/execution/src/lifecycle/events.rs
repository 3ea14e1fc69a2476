//! Lifecycle events.

use chrono::{DateTime, Utc};
use clmm_keeper_domain::entities::TokenId;
use clmm_keeper_domain::value_objects::TradeSide;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Type of lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleEventType {
    /// A rebalancing swap was confirmed.
    TradeExecuted,
    /// A new position was minted.
    PositionMinted,
    /// A position was withdrawn and burned.
    PositionExited,
    /// Entry postponed by the trade cooldown.
    EntryDeferred,
    /// Entry abandoned because the wallet could not fund a position.
    EntrySkipped,
}

/// A lifecycle event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEvent {
    /// Event ID.
    pub id: String,
    pub event_type: LifecycleEventType,
    /// Position the event refers to, when there is one.
    pub token_id: Option<TokenId>,
    /// Hash of the confirming transaction.
    pub tx_hash: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub data: EventData,
}

impl LifecycleEvent {
    pub fn new(event_type: LifecycleEventType, data: EventData) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event_type,
            token_id: None,
            tx_hash: None,
            timestamp: Utc::now(),
            data,
        }
    }

    #[must_use]
    pub fn with_token_id(mut self, token_id: TokenId) -> Self {
        self.token_id = Some(token_id);
        self
    }

    #[must_use]
    pub fn with_tx_hash(mut self, hash: impl Into<String>) -> Self {
        self.tx_hash = Some(hash.into());
        self
    }
}

/// Event-specific data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventData {
    Trade(TradeData),
    Minted(MintedData),
    Exited(ExitedData),
    Deferred(DeferredData),
    Skipped(SkippedData),
}

/// A confirmed rebalancing swap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeData {
    pub side: TradeSide,
    /// Symbol of the token sold.
    pub sold: String,
    /// Human-readable amount sold.
    pub amount: Decimal,
    /// Pool price the trade was sized at.
    pub price: f64,
}

/// A minted position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MintedData {
    pub tick_lower: i32,
    pub tick_upper: i32,
    /// Base amount deposited.
    pub amount0: Decimal,
    /// Quote amount deposited.
    pub amount1: Decimal,
    /// Pool price the range was derived from.
    pub reference_price: f64,
}

/// An exited position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitedData {
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub liquidity: u128,
    /// Pool tick that triggered the exit.
    pub pool_tick: i32,
}

/// An entry waiting out the cooldown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeferredData {
    pub remaining_secs: i64,
}

/// An entry without enough balance to mint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedData {
    pub base_balance: Decimal,
    pub quote_balance: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_lifecycle_event_creation() {
        let event = LifecycleEvent::new(
            LifecycleEventType::PositionMinted,
            EventData::Minted(MintedData {
                tick_lower: -1000,
                tick_upper: -400,
                amount0: dec!(120.5),
                amount1: dec!(0.25),
                reference_price: 0.0009,
            }),
        )
        .with_token_id(TokenId::new(77u64));

        assert_eq!(event.event_type, LifecycleEventType::PositionMinted);
        assert_eq!(event.token_id, Some(TokenId::new(77u64)));
        assert!(event.tx_hash.is_none());
    }
}
