//! Condition gate deciding whether opening a position is justified.

use crate::config::StrategyConfig;
use crate::entities::SignalSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why the gate passed or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateReason {
    /// All conditions met.
    Met,
    /// The signal is older than the staleness bound.
    Stale,
    /// The signal row lacks an APR or volatility value.
    Missing,
    /// APR is at or below the minimum.
    AprTooLow,
    /// Volatility is at or above the maximum.
    VolatilityTooHigh,
    /// Both thresholds failed.
    Both,
}

impl fmt::Display for GateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            GateReason::Met => "all conditions met",
            GateReason::Stale => "signal is stale",
            GateReason::Missing => "signal value missing",
            GateReason::AprTooLow => "APR too low",
            GateReason::VolatilityTooHigh => "volatility too high",
            GateReason::Both => "APR too low and volatility too high",
        };
        f.write_str(text)
    }
}

/// Outcome of one gate evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GateDecision {
    pub condition: bool,
    pub reason: GateReason,
    pub apr: Option<f64>,
    pub volatility: Option<f64>,
    /// Age of the evaluated signal in seconds.
    pub age_secs: i64,
}

/// Evaluates the latest smoothed APR and volatility against the strategy thresholds.
#[derive(Debug, Clone)]
pub struct ConditionGate {
    min_apr: f64,
    max_volatility: f64,
    staleness_secs: i64,
}

impl ConditionGate {
    pub fn new(config: &StrategyConfig) -> Self {
        Self {
            min_apr: config.min_apr,
            max_volatility: config.max_volatility,
            staleness_secs: config.staleness_secs,
        }
    }

    /// Evaluates raw values sampled at `timestamp`.
    ///
    /// A sample older than the staleness bound never passes, whatever its values.
    pub fn evaluate(
        &self,
        timestamp: DateTime<Utc>,
        apr: Option<f64>,
        volatility: Option<f64>,
        now: DateTime<Utc>,
    ) -> GateDecision {
        let age_secs = (now - timestamp).num_seconds();
        let decision = |condition, reason| GateDecision {
            condition,
            reason,
            apr,
            volatility,
            age_secs,
        };

        if age_secs > self.staleness_secs {
            return decision(false, GateReason::Stale);
        }
        let (Some(apr_value), Some(vol_value)) = (apr, volatility) else {
            return decision(false, GateReason::Missing);
        };

        let apr_ok = apr_value > self.min_apr;
        let vol_ok = vol_value < self.max_volatility;
        match (apr_ok, vol_ok) {
            (true, true) => decision(true, GateReason::Met),
            (false, false) => decision(false, GateReason::Both),
            (false, true) => decision(false, GateReason::AprTooLow),
            (true, false) => decision(false, GateReason::VolatilityTooHigh),
        }
    }

    /// Evaluates a persisted signal row using the configured columns.
    pub fn evaluate_snapshot(
        &self,
        snapshot: &SignalSnapshot,
        apr_column: &str,
        volatility_column: &str,
        now: DateTime<Utc>,
    ) -> GateDecision {
        self.evaluate(
            snapshot.timestamp,
            snapshot.value(apr_column),
            snapshot.value(volatility_column),
            now,
        )
    }
}
