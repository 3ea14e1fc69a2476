use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Spot prices of the tracked assets at one instant, quoted in USD.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSample {
    pub timestamp: DateTime<Utc>,
    pub prices: BTreeMap<String, f64>,
}

impl PriceSample {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            prices: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_price(mut self, asset: impl Into<String>, price: f64) -> Self {
        self.prices.insert(asset.into(), price);
        self
    }

    pub fn price(&self, asset: &str) -> Option<f64> {
        self.prices.get(asset).copied()
    }
}

/// Yield percentages per tracked instrument. A missing reading stays `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AprSample {
    pub timestamp: DateTime<Utc>,
    pub values: BTreeMap<String, Option<f64>>,
}

impl AprSample {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            values: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_value(mut self, instrument: impl Into<String>, value: Option<f64>) -> Self {
        self.values.insert(instrument.into(), value);
        self
    }

    pub fn value(&self, instrument: &str) -> Option<f64> {
        self.values.get(instrument).copied().flatten()
    }
}
