//! Pending-transaction registry.
//!
//! Every write is tracked from submission until its receipt arrives or the
//! attempt is abandoned. The guard removes the entry when dropped, so the
//! registry is also cleaned up when a timed-out or cancelled future is dropped.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// A transaction awaiting confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransaction {
    pub id: Uuid,
    /// Step that submitted it, e.g. `swap` or `mint`.
    pub operation: &'static str,
    pub submitted_at: DateTime<Utc>,
}

/// In-flight writes of the controller.
#[derive(Debug, Clone, Default)]
pub struct PendingTransactions {
    entries: Arc<Mutex<HashMap<Uuid, PendingTransaction>>>,
}

impl PendingTransactions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a write; it stays pending until the returned guard is dropped.
    pub fn track(&self, operation: &'static str) -> PendingGuard {
        let entry = PendingTransaction {
            id: Uuid::new_v4(),
            operation,
            submitted_at: Utc::now(),
        };
        let id = entry.id;
        let mut entries = self.entries.lock();
        if !entries.is_empty() {
            warn!(operation, in_flight = entries.len(), "Write started while others are pending");
        }
        entries.insert(id, entry);
        debug!(operation, %id, "Transaction pending");

        PendingGuard {
            entries: Arc::clone(&self.entries),
            id,
        }
    }

    pub fn in_flight(&self) -> Vec<PendingTransaction> {
        self.entries.lock().values().cloned().collect()
    }

    pub fn is_idle(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// Keeps one write registered for as long as it lives.
#[derive(Debug)]
pub struct PendingGuard {
    entries: Arc<Mutex<HashMap<Uuid, PendingTransaction>>>,
    id: Uuid,
}

impl PendingGuard {
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if let Some(entry) = self.entries.lock().remove(&self.id) {
            debug!(operation = entry.operation, id = %self.id, "Transaction settled");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_guard_releases_on_drop() {
        let pending = PendingTransactions::new();
        {
            let guard = pending.track("swap");
            let in_flight = pending.in_flight();
            assert_eq!(in_flight.len(), 1);
            assert_eq!(in_flight[0].id, guard.id());
            assert_eq!(in_flight[0].operation, "swap");
        }
        assert!(pending.is_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn test_guard_releases_on_timeout() {
        let pending = PendingTransactions::new();
        let tracker = pending.clone();
        let result = tokio::time::timeout(Duration::from_secs(1), async move {
            let _guard = tracker.track("mint");
            std::future::pending::<()>().await;
        })
        .await;

        assert!(result.is_err());
        assert!(pending.is_idle());
    }
}
