//! Scheduler for the keeper's periodic cycles.
//!
//! Provides:
//! - Interval task timing
//! - A single-flight guard so a slow cycle is never overlapped by its next trigger

mod single_flight;

pub use single_flight::SingleFlight;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, interval};
use tracing::{debug, info, warn};

/// Schedule type for task execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Schedule {
    /// Run at fixed intervals.
    Interval(Duration),
}

/// A scheduled task.
#[derive(Debug, Clone)]
pub struct ScheduledTask {
    /// Task name.
    pub name: String,
    pub schedule: Schedule,
    /// Fire on the first scheduler tick instead of one period later.
    pub run_at_start: bool,
    pub last_run: Option<Instant>,
    pub next_run: Option<Instant>,
}

impl ScheduledTask {
    pub fn new(name: impl Into<String>, schedule: Schedule) -> Self {
        Self {
            name: name.into(),
            schedule,
            run_at_start: false,
            last_run: None,
            next_run: None,
        }
    }

    #[must_use]
    pub fn immediately(mut self) -> Self {
        self.run_at_start = true;
        self
    }
}

/// Event sent when a task should run.
#[derive(Debug, Clone)]
pub struct TaskEvent {
    pub task_name: String,
    /// Scheduled time.
    pub scheduled_at: Instant,
    /// Actual trigger time.
    pub triggered_at: Instant,
}

/// Emits a [`TaskEvent`] each time a task is due.
pub struct Scheduler {
    tasks: Vec<ScheduledTask>,
    event_tx: mpsc::Sender<TaskEvent>,
    event_rx: Option<mpsc::Receiver<TaskEvent>>,
    running: Arc<AtomicBool>,
    resolution: Duration,
}

impl Scheduler {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(100);
        Self {
            tasks: Vec::new(),
            event_tx: tx,
            event_rx: Some(rx),
            running: Arc::new(AtomicBool::new(false)),
            resolution: Duration::from_secs(1),
        }
    }

    pub fn add_task(&mut self, task: ScheduledTask) {
        info!(task = %task.name, schedule = ?task.schedule, "Adding task to scheduler");
        self.tasks.push(task);
    }

    /// Takes the event receiver for processing events.
    pub fn take_receiver(&mut self) -> Option<mpsc::Receiver<TaskEvent>> {
        self.event_rx.take()
    }

    /// Handle that stops the loop from another task.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Runs the scheduler loop until stopped or the receiver is dropped.
    pub async fn start(&mut self) {
        self.running.store(true, Ordering::SeqCst);

        info!(tasks = self.tasks.len(), "Starting scheduler");

        let now = Instant::now();
        for task in &mut self.tasks {
            task.next_run = Some(if task.run_at_start {
                now
            } else {
                Self::calculate_next_run(&task.schedule, now)
            });
        }

        let mut check_interval = interval(self.resolution);

        while self.running.load(Ordering::SeqCst) {
            check_interval.tick().await;

            let now = Instant::now();
            let mut events_to_send = Vec::new();

            for task in &mut self.tasks {
                if let Some(next_run) = task.next_run
                    && now >= next_run
                {
                    events_to_send.push(TaskEvent {
                        task_name: task.name.clone(),
                        scheduled_at: next_run,
                        triggered_at: now,
                    });

                    task.last_run = Some(now);
                    task.next_run = Some(Self::calculate_next_run(&task.schedule, now));

                    debug!(task = %task.name, next_run = ?task.next_run, "Task triggered");
                }
            }

            for event in events_to_send {
                let task_name = event.task_name.clone();
                if let Err(e) = self.event_tx.send(event).await {
                    warn!(task = %task_name, error = %e, "Task receiver gone, stopping scheduler");
                    self.running.store(false, Ordering::SeqCst);
                }
            }
        }

        info!("Scheduler stopped");
    }

    fn calculate_next_run(schedule: &Schedule, from: Instant) -> Instant {
        match schedule {
            Schedule::Interval(duration) => from + *duration,
        }
    }

    pub fn tasks(&self) -> &[ScheduledTask] {
        &self.tasks
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for creating common schedules.
pub struct ScheduleBuilder;

impl ScheduleBuilder {
    pub fn every_secs(secs: u64) -> Schedule {
        Schedule::Interval(Duration::from_secs(secs))
    }
}
