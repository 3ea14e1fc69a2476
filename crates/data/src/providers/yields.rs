//! Yield readings from the Ramses mixed-pairs document.

use super::YieldFeed;
use crate::config::InstrumentConfig;
use crate::error::Result;
use async_trait::async_trait;
use chrono::Utc;
use clmm_keeper_domain::entities::AprSample;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Top-level yield document.
#[derive(Debug, Clone, Deserialize)]
pub struct YieldDocument {
    #[serde(default)]
    pub pairs: Vec<YieldPair>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct YieldPair {
    pub id: String,
    #[serde(default, rename = "recommendedRangesNew")]
    pub recommended_ranges: Vec<YieldRange>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct YieldRange {
    pub name: String,
    #[serde(default, rename = "lpApr")]
    pub lp_apr: Option<f64>,
}

impl YieldDocument {
    /// `lpApr` of the named range of a pair, matched case-insensitively on the id.
    pub fn lp_apr(&self, instrument: &InstrumentConfig) -> Option<f64> {
        let Some(pair) = self
            .pairs
            .iter()
            .find(|p| p.id.eq_ignore_ascii_case(&instrument.id))
        else {
            warn!(id = %instrument.id, "No pair found in yield feed");
            return None;
        };
        let Some(range) = pair
            .recommended_ranges
            .iter()
            .find(|r| r.name == instrument.range_name)
        else {
            warn!(id = %instrument.id, range = %instrument.range_name, "No range found in yield feed");
            return None;
        };
        range.lp_apr.filter(|v| v.is_finite())
    }

    pub fn sample(&self, instruments: &[InstrumentConfig]) -> AprSample {
        instruments
            .iter()
            .fold(AprSample::new(Utc::now()), |sample, instrument| {
                sample.with_value(instrument.heading.clone(), self.lp_apr(instrument))
            })
    }
}

/// Reads the published pairs document over HTTP.
pub struct RamsesYieldProvider {
    http: Client,
    url: String,
}

impl RamsesYieldProvider {
    #[must_use]
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|err| {
                warn!(error = %err, "Failed to build HTTP client, using defaults");
                Client::new()
            });
        Self {
            http,
            url: url.into(),
        }
    }
}

#[async_trait]
impl YieldFeed for RamsesYieldProvider {
    async fn fetch_yields(&self, instruments: &[InstrumentConfig]) -> Result<AprSample> {
        let document: YieldDocument = self
            .http
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        debug!(pairs = document.pairs.len(), "Fetched yield document");
        Ok(document.sample(instruments))
    }
}
