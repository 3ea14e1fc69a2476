//! Single-flight guard for periodic cycles.

use std::future::Future;
use tokio::sync::Mutex;
use tracing::warn;

/// Lets at most one run of a cycle be in flight. A trigger arriving while the
/// previous run is still suspended is dropped, not queued.
#[derive(Debug)]
pub struct SingleFlight {
    name: &'static str,
    lock: Mutex<()>,
}

impl SingleFlight {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            lock: Mutex::new(()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_running(&self) -> bool {
        self.lock.try_lock().is_err()
    }

    /// Runs `cycle` unless another run holds the guard; returns `None` if skipped.
    pub async fn run<F, T>(&self, cycle: F) -> Option<T>
    where
        F: Future<Output = T>,
    {
        let Ok(_guard) = self.lock.try_lock() else {
            warn!(cycle = self.name, "Previous run still in flight, skipping");
            return None;
        };
        Some(cycle.await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_overlapping_run_is_skipped() {
        let flight = Arc::new(SingleFlight::new("evaluate"));
        let (release_tx, release_rx) = oneshot::channel::<()>();
        let (started_tx, started_rx) = oneshot::channel::<()>();

        let first = {
            let flight = Arc::clone(&flight);
            tokio::spawn(async move {
                flight
                    .run(async move {
                        let _ = started_tx.send(());
                        let _ = release_rx.await;
                        1
                    })
                    .await
            })
        };

        started_rx.await.unwrap();
        assert!(flight.is_running());
        assert_eq!(flight.run(async { 2 }).await, None);

        release_tx.send(()).unwrap();
        assert_eq!(first.await.unwrap(), Some(1));
        assert!(!flight.is_running());
        assert_eq!(flight.run(async { 3 }).await, Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_guard_released_when_run_is_dropped() {
        let flight = SingleFlight::new("collect");
        let timed_out = tokio::time::timeout(
            Duration::from_secs(1),
            flight.run(std::future::pending::<()>()),
        )
        .await;

        assert!(timed_out.is_err());
        assert!(!flight.is_running());
    }
}
