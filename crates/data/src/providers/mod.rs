//! External price and yield feeds.

mod spot;
mod yields;

pub use spot::SpotPriceProvider;
pub use yields::{RamsesYieldProvider, YieldDocument, YieldPair, YieldRange};

use crate::config::InstrumentConfig;
use crate::error::Result;
use async_trait::async_trait;
use clmm_keeper_domain::entities::{AprSample, PriceSample};

/// Fetches one USD spot price per tracked asset.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// Asset names, in the order they are fetched.
    fn assets(&self) -> Vec<String>;

    /// Fetches every price. Any single failure fails the whole sample.
    async fn fetch_prices(&self) -> Result<PriceSample>;
}

/// Fetches the current yield of each tracked instrument.
#[async_trait]
pub trait YieldFeed: Send + Sync {
    /// Instruments the feed does not list are reported as `None`.
    async fn fetch_yields(&self, instruments: &[InstrumentConfig]) -> Result<AprSample>;
}
