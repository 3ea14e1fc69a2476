//! Strategy parameters.
//!
//! Every constant the signal and range computations depend on lives here, with
//! defaults matching the live strategy, so deployments can tune them from the
//! configuration file instead of rebuilding.

use crate::entities::PriceSample;
use crate::error::{DomainError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Asset name whose price is pinned to 1 (prices are USD-quoted).
pub const UNIT_ASSET: &str = "USD";

/// Parameters of the tick range finder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeConfig {
    /// Price ratio of one tick step.
    pub tick_multiplier: f64,
    /// Grid the upper tick is snapped up to.
    pub grid_ticks: i32,
    /// Extra ticks added above the snapped grid point.
    pub upper_offset_ticks: i32,
    /// Total width of the range in ticks.
    pub width_ticks: i32,
    /// Ticks a held range is widened by on each side before it counts as out of range.
    pub range_buffer_ticks: i32,
    /// Lower clamp for the above-price proportion.
    pub min_proportion: f64,
    /// Upper clamp for the above-price proportion.
    pub max_proportion: f64,
}

impl Default for RangeConfig {
    fn default() -> Self {
        Self {
            tick_multiplier: 1.0001,
            grid_ticks: 200,
            upper_offset_ticks: 200,
            width_ticks: 600,
            range_buffer_ticks: 200,
            min_proportion: 0.2,
            max_proportion: 0.8,
        }
    }
}

impl RangeConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.tick_multiplier.is_finite() && self.tick_multiplier > 1.0) {
            return Err(DomainError::config(
                "range.tick_multiplier",
                format!("must be greater than 1, got {}", self.tick_multiplier),
            ));
        }
        if self.grid_ticks <= 0 {
            return Err(DomainError::config("range.grid_ticks", "must be positive"));
        }
        if self.width_ticks <= 0 {
            return Err(DomainError::config("range.width_ticks", "must be positive"));
        }
        if self.range_buffer_ticks < 0 {
            return Err(DomainError::config(
                "range.range_buffer_ticks",
                "must not be negative",
            ));
        }
        if !(0.0..=1.0).contains(&self.min_proportion)
            || !(0.0..=1.0).contains(&self.max_proportion)
            || self.min_proportion > self.max_proportion
        {
            return Err(DomainError::config(
                "range.min_proportion",
                format!(
                    "bounds must satisfy 0 <= min <= max <= 1, got [{}, {}]",
                    self.min_proportion, self.max_proportion
                ),
            ));
        }
        Ok(())
    }
}

/// Parameters of the volatility estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolatilityConfig {
    /// Smoothing factor applied to squared log-returns.
    pub alpha: f64,
    /// Only samples younger than this are considered.
    pub lookback_minutes: i64,
    /// Only samples whose minute is a multiple of this are considered.
    pub grid_minutes: u32,
    /// Normalization applied to the smoothed volatility.
    pub scale: f64,
}

impl Default for VolatilityConfig {
    fn default() -> Self {
        Self {
            alpha: 0.2,
            lookback_minutes: 240,
            grid_minutes: 10,
            scale: 1000.0,
        }
    }
}

impl VolatilityConfig {
    pub fn validate(&self) -> Result<()> {
        validate_alpha("volatility.alpha", self.alpha)?;
        if self.lookback_minutes <= 0 {
            return Err(DomainError::config(
                "volatility.lookback_minutes",
                "must be positive",
            ));
        }
        if self.grid_minutes == 0 || self.grid_minutes > 60 {
            return Err(DomainError::config(
                "volatility.grid_minutes",
                "must be within 1..=60",
            ));
        }
        Ok(())
    }
}

/// Decision thresholds and signal parameters of the strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Smoothed APR must be strictly above this to open a position.
    pub min_apr: f64,
    /// Smoothed volatility must be strictly below this to open a position.
    pub max_volatility: f64,
    /// Signals older than this never authorize action.
    pub staleness_secs: i64,
    /// Minimum interval between two rebalancing trades.
    pub cooldown_secs: i64,
    /// Smoothing factor for APR samples.
    pub apr_alpha: f64,
    /// Number of most recent APR samples smoothed per evaluation.
    pub apr_window: usize,
    /// Signal column read as the APR input of the gate.
    pub apr_column: String,
    /// Signal column read as the volatility input of the gate.
    pub volatility_column: String,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            min_apr: 400.0,
            max_volatility: 2.0,
            staleness_secs: 60 * 60,
            cooldown_secs: 60 * 60,
            apr_alpha: 0.4,
            apr_window: 6,
            apr_column: "ZRO-ETH 2% APR".to_string(),
            volatility_column: "ZRO-ETH Volatility".to_string(),
        }
    }
}

impl StrategyConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.min_apr.is_finite() {
            return Err(DomainError::config("strategy.min_apr", "must be finite"));
        }
        if !self.max_volatility.is_finite() || self.max_volatility <= 0.0 {
            return Err(DomainError::config(
                "strategy.max_volatility",
                "must be positive",
            ));
        }
        if self.staleness_secs <= 0 {
            return Err(DomainError::config(
                "strategy.staleness_secs",
                "must be positive",
            ));
        }
        if self.cooldown_secs < 0 {
            return Err(DomainError::config(
                "strategy.cooldown_secs",
                "must not be negative",
            ));
        }
        validate_alpha("strategy.apr_alpha", self.apr_alpha)?;
        if self.apr_window == 0 {
            return Err(DomainError::config("strategy.apr_window", "must be positive"));
        }
        if self.apr_column.is_empty() || self.volatility_column.is_empty() {
            return Err(DomainError::config(
                "strategy.apr_column",
                "signal columns must be named",
            ));
        }
        Ok(())
    }
}

/// Checks that a smoothing factor lies in (0, 1).
pub fn validate_alpha(field: &'static str, alpha: f64) -> Result<()> {
    if alpha > 0.0 && alpha < 1.0 {
        Ok(())
    } else {
        Err(DomainError::config(
            field,
            format!("smoothing factor must be in (0, 1), got {alpha}"),
        ))
    }
}

/// A pair price expressed as the ratio of two USD-quoted asset prices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairDefinition {
    pub numerator: String,
    pub denominator: String,
}

impl PairDefinition {
    pub fn new(numerator: impl Into<String>, denominator: impl Into<String>) -> Self {
        Self {
            numerator: numerator.into(),
            denominator: denominator.into(),
        }
    }

    /// Pair price from a sample, or `None` when either leg is missing or the ratio is not finite.
    pub fn price(&self, sample: &PriceSample) -> Option<f64> {
        let leg = |asset: &str| {
            if asset == UNIT_ASSET {
                Some(1.0)
            } else {
                sample.price(asset)
            }
        };
        let price = leg(&self.numerator)? / leg(&self.denominator)?;
        (price.is_finite() && price > 0.0).then_some(price)
    }
}

/// Named pairs the volatility estimator knows how to price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PairRegistry {
    pairs: BTreeMap<String, PairDefinition>,
}

impl PairRegistry {
    pub fn new() -> Self {
        Self {
            pairs: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_pair(mut self, name: impl Into<String>, pair: PairDefinition) -> Self {
        self.pairs.insert(name.into(), pair);
        self
    }

    /// Looks up a pair; unknown names are a configuration error.
    pub fn resolve(&self, name: &str) -> Result<&PairDefinition> {
        self.pairs
            .get(name)
            .ok_or_else(|| DomainError::InvalidPair(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.pairs.keys().map(String::as_str)
    }
}

impl Default for PairRegistry {
    fn default() -> Self {
        Self::new()
            .with_pair("ETH-ARB", PairDefinition::new("ETH", "ARB"))
            .with_pair("ARB-USDC", PairDefinition::new("ARB", UNIT_ASSET))
            .with_pair("ETH-USDC", PairDefinition::new("ETH", UNIT_ASSET))
            .with_pair("ETH-BTC", PairDefinition::new("ETH", "BTC"))
            // Quoted as ETH per ZRO, matching the pool orientation.
            .with_pair("ZRO-ETH", PairDefinition::new("ETH", "ZRO"))
    }
}
