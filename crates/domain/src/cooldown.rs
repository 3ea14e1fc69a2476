use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Time of the last rebalancing trade, kept for the life of the process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownState {
    last_trade: Option<DateTime<Utc>>,
}

impl CooldownState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_trade(&self) -> Option<DateTime<Utc>> {
        self.last_trade
    }

    /// Time left before another trade is allowed, or `None` when trading is allowed now.
    pub fn remaining(&self, now: DateTime<Utc>, limit: Duration) -> Option<Duration> {
        let last = self.last_trade?;
        let elapsed = now - last;
        (elapsed < limit).then(|| limit - elapsed)
    }

    /// Records a successful trade. The stored timestamp never moves backwards.
    pub fn record(&mut self, at: DateTime<Utc>) {
        self.last_trade = Some(self.last_trade.map_or(at, |last| last.max(at)));
    }
}
