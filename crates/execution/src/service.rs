//! Keeper service: runs the collection and decision cycles on their schedules.
//!
//! Each cycle has its own single-flight guard, so a slow on-chain sequence is
//! never overlapped by the next trigger of the same cycle.

use crate::error::Result;
use crate::scheduler::{ScheduleBuilder, ScheduledTask, Scheduler, SingleFlight, TaskEvent};
use crate::strategy::DecisionCycle;
use crate::transaction::RetryPolicy;
use chrono::{DateTime, Utc};
use clmm_keeper_data::collector::{FeedCollector, SignalCollector};
use clmm_keeper_domain::entities::{AprSample, PriceSample, SignalSnapshot};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

pub const PRICES_TASK: &str = "prices";
pub const YIELDS_TASK: &str = "yields";
pub const SIGNALS_TASK: &str = "signals";
pub const EVALUATE_TASK: &str = "evaluate";

/// Cycle periods in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub prices_secs: u64,
    pub yields_secs: u64,
    pub signals_secs: u64,
    pub evaluate_secs: u64,
    /// Fire every cycle once at startup instead of waiting a full period.
    pub run_at_start: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            prices_secs: 60,
            yields_secs: 600,
            signals_secs: 600,
            evaluate_secs: 600,
            run_at_start: true,
        }
    }
}

/// Owns the cycles and their guards.
pub struct KeeperService {
    feeds: Option<Arc<FeedCollector>>,
    signals: Arc<SignalCollector>,
    decision: Option<Arc<DecisionCycle>>,
    schedule: ScheduleConfig,
    retry: RetryPolicy,
    prices_flight: Arc<SingleFlight>,
    yields_flight: Arc<SingleFlight>,
    signals_flight: Arc<SingleFlight>,
    evaluate_flight: Arc<SingleFlight>,
}

impl KeeperService {
    pub fn new(signals: Arc<SignalCollector>, schedule: ScheduleConfig) -> Self {
        Self {
            feeds: None,
            signals,
            decision: None,
            schedule,
            retry: RetryPolicy::default(),
            prices_flight: Arc::new(SingleFlight::new(PRICES_TASK)),
            yields_flight: Arc::new(SingleFlight::new(YIELDS_TASK)),
            signals_flight: Arc::new(SingleFlight::new(SIGNALS_TASK)),
            evaluate_flight: Arc::new(SingleFlight::new(EVALUATE_TASK)),
        }
    }

    /// Enables the price and yield collection cycles.
    #[must_use]
    pub fn with_feeds(mut self, feeds: Arc<FeedCollector>) -> Self {
        self.feeds = Some(feeds);
        self
    }

    /// Retry policy for feed reads.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Enables the decision cycle.
    #[must_use]
    pub fn with_decision(mut self, decision: Arc<DecisionCycle>) -> Self {
        self.decision = Some(decision);
        self
    }

    /// Tasks for the cycles that are configured.
    pub fn tasks(&self) -> Vec<ScheduledTask> {
        let mut tasks = Vec::new();
        let mut push = |name: &str, secs: u64| {
            let task = ScheduledTask::new(name, ScheduleBuilder::every_secs(secs));
            tasks.push(if self.schedule.run_at_start {
                task.immediately()
            } else {
                task
            });
        };
        if self.feeds.is_some() {
            push(PRICES_TASK, self.schedule.prices_secs);
            push(YIELDS_TASK, self.schedule.yields_secs);
        }
        push(SIGNALS_TASK, self.schedule.signals_secs);
        if self.decision.is_some() {
            push(EVALUATE_TASK, self.schedule.evaluate_secs);
        }
        tasks
    }

    fn feeds(&self) -> Result<&FeedCollector> {
        self.feeds
            .as_deref()
            .ok_or(crate::error::ExecutionError::UnexpectedState {
                step: "collect",
                reason: "no feeds configured".into(),
            })
    }

    /// Reads the price feed, retrying transient failures, and appends one row.
    pub async fn collect_prices(&self) -> Result<PriceSample> {
        let feeds = self.feeds()?;
        let sample = self
            .retry
            .run("price feed", || feeds.fetch_prices())
            .await?;
        feeds.store_prices(&sample).await?;
        Ok(sample)
    }

    /// Reads the yield feed, retrying transient failures, and appends one row.
    pub async fn collect_yields(&self) -> Result<AprSample> {
        let feeds = self.feeds()?;
        let sample = self
            .retry
            .run("yield feed", || feeds.fetch_yields())
            .await?;
        feeds.store_yields(&sample).await?;
        Ok(sample)
    }

    /// Computes and appends one signal row as of `now`.
    pub async fn collect_signals(&self, now: DateTime<Utc>) -> Result<SignalSnapshot> {
        Ok(self.signals.collect(now).await?)
    }

    /// Runs one cycle to completion under its guard.
    ///
    /// Returns `false` when the cycle is unknown, not configured, or still running.
    pub async fn run_task(&self, name: &str) -> bool {
        match name {
            PRICES_TASK => {
                if self.feeds.is_none() {
                    return false;
                }
                self.prices_flight
                    .run(async {
                        if let Err(e) = self.collect_prices().await {
                            error!(error = %e, "Price collection failed");
                        }
                    })
                    .await
                    .is_some()
            }
            YIELDS_TASK => {
                if self.feeds.is_none() {
                    return false;
                }
                self.yields_flight
                    .run(async {
                        if let Err(e) = self.collect_yields().await {
                            error!(error = %e, "Yield collection failed");
                        }
                    })
                    .await
                    .is_some()
            }
            SIGNALS_TASK => self
                .signals_flight
                .run(async {
                    if let Err(e) = self.collect_signals(Utc::now()).await {
                        error!(error = %e, "Signal computation failed");
                    }
                })
                .await
                .is_some(),
            EVALUATE_TASK => {
                let Some(decision) = &self.decision else {
                    return false;
                };
                self.evaluate_flight
                    .run(async {
                        match decision.run(Utc::now()).await {
                            Ok(report) => {
                                let stats =
                                    decision.controller().lifecycle().get_aggregate_stats().await;
                                info!(
                                    gate = ?report.gate,
                                    outcome = ?report.outcome,
                                    open_positions = stats.open_positions,
                                    closed_positions = stats.closed_positions,
                                    trades = stats.trades,
                                    deferred = stats.deferred_entries,
                                    skipped = stats.skipped_entries,
                                    "Decision cycle finished"
                                )
                            }
                            Err(e) => error!(error = %e, "Decision cycle failed"),
                        }
                    })
                    .await
                    .is_some()
            }
            other => {
                warn!(task = other, "Unknown task");
                false
            }
        }
    }

    /// Drives the scheduler until `shutdown` resolves, then waits for cycles in flight.
    pub async fn run(self: Arc<Self>, shutdown: impl Future<Output = ()>) {
        let mut scheduler = Scheduler::new();
        for task in self.tasks() {
            scheduler.add_task(task);
        }
        let Some(mut events) = scheduler.take_receiver() else {
            return;
        };
        let stop = scheduler.stop_handle();
        let scheduler_handle = tokio::spawn(async move { scheduler.start().await });

        let mut running = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                event = events.recv() => {
                    let Some(event) = event else { break };
                    self.spawn_cycle(&mut running, event);
                }
                Some(joined) = running.join_next(), if !running.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "Cycle task panicked");
                    }
                }
            }
        }

        stop.store(false, std::sync::atomic::Ordering::SeqCst);
        drop(events);
        if !running.is_empty() {
            info!(in_flight = running.len(), "Waiting for running cycles");
        }
        while let Some(joined) = running.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Cycle task panicked");
            }
        }
        if let Err(e) = scheduler_handle.await {
            error!(error = %e, "Scheduler task failed");
        }
        info!("Keeper stopped");
    }

    fn spawn_cycle(self: &Arc<Self>, running: &mut JoinSet<()>, event: TaskEvent) {
        let lag = event.triggered_at.duration_since(event.scheduled_at);
        debug!(task = %event.task_name, lag_ms = lag.as_millis() as u64, "Dispatching cycle");
        let service = Arc::clone(self);
        running.spawn(async move {
            service.run_task(&event.task_name).await;
        });
    }
}
