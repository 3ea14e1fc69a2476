//! Realized-volatility proxy over a downsampled price series.

use crate::config::{PairDefinition, VolatilityConfig};
use crate::entities::PriceSample;
use crate::error::{DomainError, Result};
use crate::math::ewma::ewma;
use chrono::{DateTime, Duration, Timelike, Utc};

/// Pair prices inside the lookback window whose timestamps fall on the sampling grid.
///
/// The grid filter deliberately downsamples minute data to the configured cadence.
pub fn grid_prices(
    samples: &[PriceSample],
    pair: &PairDefinition,
    now: DateTime<Utc>,
    config: &VolatilityConfig,
) -> Vec<f64> {
    let lookback = Duration::minutes(config.lookback_minutes);
    samples
        .iter()
        .filter(|s| now - s.timestamp <= lookback)
        .filter(|s| s.timestamp.minute() % config.grid_minutes == 0)
        .filter_map(|s| pair.price(s))
        .collect()
}

/// Smoothed volatility of a price series: sqrt(EWMA(ln(pᵢ/pᵢ₋₁)²)) × scale.
pub fn volatility_from_prices(prices: &[f64], alpha: f64, scale: f64) -> Result<f64> {
    if prices.len() < 2 {
        return Err(DomainError::InsufficientData {
            required: 2,
            actual: prices.len(),
        });
    }
    let squared_returns: Vec<f64> = prices
        .windows(2)
        .map(|w| (w[1] / w[0]).ln().powi(2))
        .collect();
    Ok(ewma(&squared_returns, alpha)?.sqrt() * scale)
}

/// Estimates the volatility of `pair` as of `now`.
pub fn estimate_volatility(
    samples: &[PriceSample],
    pair: &PairDefinition,
    now: DateTime<Utc>,
    config: &VolatilityConfig,
) -> Result<f64> {
    let prices = grid_prices(samples, pair, now, config);
    volatility_from_prices(&prices, config.alpha, config.scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn eth_btc() -> PairDefinition {
        PairDefinition::new("ETH", "BTC")
    }

    fn sample(minute_offset: i64, eth: f64) -> PriceSample {
        let base = Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap();
        PriceSample::new(base + Duration::minutes(minute_offset))
            .with_price("ETH", eth)
            .with_price("BTC", 1.0)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 1, 13, 0, 0).unwrap()
    }

    #[test]
    fn test_fewer_than_two_points_is_insufficient() {
        let samples = vec![sample(0, 100.0)];
        let result = estimate_volatility(&samples, &eth_btc(), now(), &VolatilityConfig::default());
        assert_eq!(
            result,
            Err(DomainError::InsufficientData {
                required: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn test_two_points_smooth_single_return() {
        let samples = vec![sample(0, 100.0), sample(10, 101.0)];
        let vol =
            estimate_volatility(&samples, &eth_btc(), now(), &VolatilityConfig::default()).unwrap();
        let expected = (101.0f64 / 100.0).ln().abs() * 1000.0;
        assert!((vol - expected).abs() < 1e-9);
    }

    #[test]
    fn test_six_point_series_is_reproducible() {
        let prices = [100.0, 101.0, 99.0, 102.0, 98.0, 103.0];
        let samples: Vec<PriceSample> = prices
            .iter()
            .enumerate()
            .map(|(i, p)| sample(i as i64 * 10, *p))
            .collect();
        let config = VolatilityConfig::default();

        let first = estimate_volatility(&samples, &eth_btc(), now(), &config).unwrap();
        let second = estimate_volatility(&samples, &eth_btc(), now(), &config).unwrap();
        assert_eq!(first, second);

        let mut acc = (101.0f64 / 100.0).ln().powi(2);
        for w in prices.windows(2).skip(1) {
            acc = 0.2 * (w[1] / w[0]).ln().powi(2) + 0.8 * acc;
        }
        assert!((first - acc.sqrt() * 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_off_grid_and_old_samples_are_dropped() {
        let samples = vec![
            sample(-200, 50.0), // outside the 4h window relative to now
            sample(0, 100.0),
            sample(5, 500.0), // not on the 10 minute grid
            sample(10, 101.0),
        ];
        let prices = grid_prices(&samples, &eth_btc(), now(), &VolatilityConfig::default());
        assert_eq!(prices, vec![100.0, 101.0]);
    }

    #[test]
    fn test_missing_leg_is_skipped() {
        let base = Utc.with_ymd_and_hms(2024, 7, 1, 12, 20, 0).unwrap();
        let mut samples = vec![sample(0, 100.0), sample(10, 101.0)];
        samples.push(PriceSample::new(base).with_price("ETH", 3000.0));
        let prices = grid_prices(&samples, &eth_btc(), now(), &VolatilityConfig::default());
        assert_eq!(prices.len(), 2);
    }
}
