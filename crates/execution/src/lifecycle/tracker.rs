//! Lifecycle tracker for position history.

use super::{
    DeferredData, EventData, ExitedData, LifecycleEvent, LifecycleEventType, MintedData,
    SkippedData, TradeData,
};
use chrono::{DateTime, Utc};
use clmm_keeper_domain::entities::TokenId;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Events retained before the oldest are dropped.
pub const DEFAULT_MAX_EVENTS: usize = 1000;

/// Summary of one position's lifetime.
#[derive(Debug, Clone)]
pub struct PositionSummary {
    pub token_id: TokenId,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub is_open: bool,
}

/// Tracks lifecycle events of the managed wallet.
pub struct LifecycleTracker {
    /// Most recent events in the order they were recorded.
    events: Arc<RwLock<VecDeque<LifecycleEvent>>>,
    max_events: usize,
    /// Position summaries.
    summaries: Arc<RwLock<HashMap<TokenId, PositionSummary>>>,
}

impl LifecycleTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_EVENTS)
    }

    /// Keeps at most `max_events` events; position summaries are never dropped.
    #[must_use]
    pub fn with_capacity(max_events: usize) -> Self {
        let max_events = max_events.max(1);
        Self {
            events: Arc::new(RwLock::new(VecDeque::with_capacity(max_events.min(64)))),
            max_events,
            summaries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Records a confirmed rebalancing swap.
    pub async fn record_trade(&self, tx_hash: &str, data: TradeData) {
        info!(
            side = %data.side,
            sold = %data.sold,
            amount = %data.amount,
            price = data.price,
            tx_hash,
            "Trade executed"
        );
        let event = LifecycleEvent::new(LifecycleEventType::TradeExecuted, EventData::Trade(data))
            .with_tx_hash(tx_hash);
        self.add_event(event).await;
    }

    /// Records a minted position. The id is unknown when the post-mint lookup failed.
    pub async fn record_minted(&self, token_id: Option<TokenId>, tx_hash: &str, data: MintedData) {
        let mut event =
            LifecycleEvent::new(LifecycleEventType::PositionMinted, EventData::Minted(data.clone()))
                .with_tx_hash(tx_hash);

        if let Some(token_id) = token_id {
            event = event.with_token_id(token_id);
            self.summaries.write().await.insert(
                token_id,
                PositionSummary {
                    token_id,
                    tick_lower: data.tick_lower,
                    tick_upper: data.tick_upper,
                    opened_at: event.timestamp,
                    closed_at: None,
                    is_open: true,
                },
            );
        }
        self.add_event(event).await;

        info!(
            token_id = ?token_id.map(|t| t.to_string()),
            tick_lower = data.tick_lower,
            tick_upper = data.tick_upper,
            amount0 = %data.amount0,
            amount1 = %data.amount1,
            tx_hash,
            "Position minted"
        );
    }

    /// Records an exited position.
    pub async fn record_exited(&self, token_id: TokenId, tx_hash: &str, data: ExitedData) {
        info!(
            token_id = %token_id,
            range = format!("[{}, {}]", data.tick_lower, data.tick_upper),
            pool_tick = data.pool_tick,
            liquidity = data.liquidity,
            tx_hash,
            "Position exited"
        );

        let event = LifecycleEvent::new(LifecycleEventType::PositionExited, EventData::Exited(data))
            .with_token_id(token_id)
            .with_tx_hash(tx_hash);

        if let Some(summary) = self.summaries.write().await.get_mut(&token_id) {
            summary.closed_at = Some(event.timestamp);
            summary.is_open = false;
        }
        self.add_event(event).await;
    }

    /// Records an entry postponed by the cooldown.
    pub async fn record_deferred(&self, data: DeferredData) {
        info!(remaining_secs = data.remaining_secs, "Entry deferred by cooldown");
        self.add_event(LifecycleEvent::new(
            LifecycleEventType::EntryDeferred,
            EventData::Deferred(data),
        ))
        .await;
    }

    /// Records an entry the wallet could not fund.
    pub async fn record_skipped(&self, data: SkippedData) {
        info!(
            base_balance = %data.base_balance,
            quote_balance = %data.quote_balance,
            "Entry skipped, balances below minimum"
        );
        self.add_event(LifecycleEvent::new(
            LifecycleEventType::EntrySkipped,
            EventData::Skipped(data),
        ))
        .await;
    }

    async fn add_event(&self, event: LifecycleEvent) {
        debug!(id = %event.id, event_type = ?event.event_type, "Lifecycle event");
        let mut events = self.events.write().await;
        while events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// Retained events in recording order.
    pub async fn get_events(&self) -> Vec<LifecycleEvent> {
        self.events.read().await.iter().cloned().collect()
    }

    /// Most recent event of the given type.
    pub async fn last_event(&self, event_type: LifecycleEventType) -> Option<LifecycleEvent> {
        self.events
            .read()
            .await
            .iter()
            .rev()
            .find(|e| e.event_type == event_type)
            .cloned()
    }

    pub async fn get_open_positions(&self) -> Vec<PositionSummary> {
        self.summaries
            .read()
            .await
            .values()
            .filter(|s| s.is_open)
            .cloned()
            .collect()
    }

    pub async fn get_aggregate_stats(&self) -> AggregateStats {
        let mut stats = AggregateStats::default();

        for summary in self.summaries.read().await.values() {
            stats.total_positions += 1;
            if summary.is_open {
                stats.open_positions += 1;
            } else {
                stats.closed_positions += 1;
            }
        }
        for event in self.events.read().await.iter() {
            match event.event_type {
                LifecycleEventType::TradeExecuted => stats.trades += 1,
                LifecycleEventType::EntryDeferred => stats.deferred_entries += 1,
                LifecycleEventType::EntrySkipped => stats.skipped_entries += 1,
                LifecycleEventType::PositionMinted | LifecycleEventType::PositionExited => {}
            }
        }

        stats
    }
}

impl Default for LifecycleTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Aggregate statistics over the tracked history. Event counts cover retained events only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateStats {
    pub total_positions: u32,
    pub open_positions: u32,
    pub closed_positions: u32,
    pub trades: u32,
    pub deferred_entries: u32,
    pub skipped_entries: u32,
}
