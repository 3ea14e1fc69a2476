use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A smoothed value together with how many raw samples produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothedSignal {
    pub value: f64,
    pub basis: usize,
}

/// One row of the computed-signal history: smoothed APR per instrument and
/// volatility per pair, keyed by their column headings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SignalSnapshot {
    pub timestamp: DateTime<Utc>,
    pub values: BTreeMap<String, Option<f64>>,
}

impl SignalSnapshot {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            values: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, column: impl Into<String>, value: Option<f64>) {
        self.values.insert(column.into(), value);
    }

    pub fn value(&self, column: &str) -> Option<f64> {
        self.values.get(column).copied().flatten()
    }
}
