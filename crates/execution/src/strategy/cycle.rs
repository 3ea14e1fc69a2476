//! One decision cycle: condition gate, then the position controller.

use super::{CycleOutcome, PositionController};
use crate::error::Result;
use crate::transaction::RetryPolicy;
use chrono::{DateTime, Utc};
use clmm_keeper_data::repositories::SignalSource;
use clmm_keeper_domain::config::StrategyConfig;
use clmm_keeper_domain::gate::{ConditionGate, GateDecision, GateReason};
use std::sync::Arc;
use tracing::{info, warn};

/// What one cycle saw and did.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// `None` when no signal row exists yet.
    pub gate: Option<GateDecision>,
    /// `None` when the gate did not pass.
    pub outcome: Option<CycleOutcome>,
}

/// Gates the controller on the most recent persisted signal.
///
/// The controller only runs when the gate passes, whether or not a position is held.
pub struct DecisionCycle {
    signals: Arc<dyn SignalSource>,
    gate: ConditionGate,
    apr_column: String,
    volatility_column: String,
    controller: Arc<PositionController>,
    retry: RetryPolicy,
}

impl DecisionCycle {
    pub fn new(
        signals: Arc<dyn SignalSource>,
        strategy: &StrategyConfig,
        controller: Arc<PositionController>,
    ) -> Self {
        Self {
            signals,
            gate: ConditionGate::new(strategy),
            apr_column: strategy.apr_column.clone(),
            volatility_column: strategy.volatility_column.clone(),
            controller,
            retry: RetryPolicy::default(),
        }
    }

    /// Retry policy for the signal read.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn controller(&self) -> &Arc<PositionController> {
        &self.controller
    }

    /// Evaluates the gate against the latest signal without acting on it.
    pub async fn check_gate(&self, now: DateTime<Utc>) -> Result<Option<GateDecision>> {
        let Some(snapshot) = self
            .retry
            .run("latest signal", || self.signals.latest_signal())
            .await?
        else {
            warn!("No signal computed yet");
            return Ok(None);
        };
        let decision =
            self.gate
                .evaluate_snapshot(&snapshot, &self.apr_column, &self.volatility_column, now);

        match decision.reason {
            GateReason::Met => info!(
                apr = ?decision.apr,
                volatility = ?decision.volatility,
                "Condition met"
            ),
            GateReason::Stale => warn!(
                age_secs = decision.age_secs,
                "Signal is stale, no action allowed"
            ),
            reason => info!(
                apr = ?decision.apr,
                volatility = ?decision.volatility,
                reason = %reason,
                "Condition not met"
            ),
        }
        Ok(Some(decision))
    }

    pub async fn run(&self, now: DateTime<Utc>) -> Result<CycleReport> {
        let gate = self.check_gate(now).await?;
        if !gate.is_some_and(|g| g.condition) {
            return Ok(CycleReport {
                gate,
                outcome: None,
            });
        }

        let outcome = self.controller.evaluate(now).await?;
        Ok(CycleReport {
            gate,
            outcome: Some(outcome),
        })
    }
}
