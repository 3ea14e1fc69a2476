//! Collection cycles: feeds into histories, histories into signals.

use crate::config::{InstrumentConfig, volatility_signal_column};
use crate::error::Result;
use crate::providers::{PriceFeed, YieldFeed};
use crate::repositories::{AprRepository, HistoryStore, PriceRepository, SignalRepository};
use chrono::{DateTime, Duration, Utc};
use clmm_keeper_domain::config::{PairDefinition, PairRegistry, StrategyConfig, VolatilityConfig};
use clmm_keeper_domain::entities::{AprSample, PriceSample, SignalSnapshot};
use clmm_keeper_domain::math::{estimate_volatility, smooth_window};
use std::sync::Arc;
use tracing::{info, warn};

/// Appends feed readings to the price and yield histories.
pub struct FeedCollector {
    price_feed: Arc<dyn PriceFeed>,
    yield_feed: Arc<dyn YieldFeed>,
    prices: PriceRepository,
    aprs: AprRepository,
    instruments: Vec<InstrumentConfig>,
}

impl FeedCollector {
    pub fn new(
        price_feed: Arc<dyn PriceFeed>,
        yield_feed: Arc<dyn YieldFeed>,
        store: &HistoryStore,
        instruments: Vec<InstrumentConfig>,
    ) -> Self {
        Self {
            price_feed,
            yield_feed,
            prices: store.prices(),
            aprs: store.aprs(),
            instruments,
        }
    }

    /// Reads all spot prices from the feed without storing them.
    pub async fn fetch_prices(&self) -> Result<PriceSample> {
        self.price_feed.fetch_prices().await
    }

    /// Appends one price row.
    pub async fn store_prices(&self, sample: &PriceSample) -> Result<()> {
        self.prices.save(sample).await?;
        info!(assets = sample.prices.len(), "Prices stored");
        Ok(())
    }

    /// Reads yields for every tracked instrument; unlisted instruments stay empty.
    pub async fn fetch_yields(&self) -> Result<AprSample> {
        self.yield_feed.fetch_yields(&self.instruments).await
    }

    /// Appends one yield row.
    pub async fn store_yields(&self, sample: &AprSample) -> Result<()> {
        self.aprs.save(sample).await?;
        let missing = sample.values.values().filter(|v| v.is_none()).count();
        info!(instruments = sample.values.len(), missing, "Yields stored");
        Ok(())
    }
}

struct TrackedInstrument {
    heading: String,
    apr_column: String,
    volatility_column: String,
    pair: PairDefinition,
}

/// Smooths APR history and estimates pair volatility into signal rows.
pub struct SignalCollector {
    prices: PriceRepository,
    aprs: AprRepository,
    signals: SignalRepository,
    tracked: Vec<TrackedInstrument>,
    volatility: VolatilityConfig,
    apr_alpha: f64,
    apr_window: usize,
}

impl SignalCollector {
    /// Resolves every instrument's volatility pair up front; an unknown pair is a
    /// configuration error.
    pub fn new(
        store: &HistoryStore,
        instruments: &[InstrumentConfig],
        pairs: &PairRegistry,
        volatility: VolatilityConfig,
        strategy: &StrategyConfig,
    ) -> Result<Self> {
        let mut tracked = Vec::new();
        for instrument in instruments {
            let Some(pair_name) = instrument.volatility_pair.as_deref() else {
                continue;
            };
            tracked.push(TrackedInstrument {
                heading: instrument.heading.clone(),
                apr_column: instrument.apr_signal_column(),
                volatility_column: volatility_signal_column(pair_name),
                pair: pairs.resolve(pair_name)?.clone(),
            });
        }

        Ok(Self {
            prices: store.prices(),
            aprs: store.aprs(),
            signals: store.signals(),
            tracked,
            volatility,
            apr_alpha: strategy.apr_alpha,
            apr_window: strategy.apr_window,
        })
    }

    /// Computes the signal row as of `now` without persisting it.
    ///
    /// A value that cannot be computed is left empty instead of failing the row.
    pub async fn compute(&self, now: DateTime<Utc>) -> Result<SignalSnapshot> {
        let apr_history = self.aprs.find_all().await?;
        let lookback = Duration::minutes(self.volatility.lookback_minutes);
        let price_history = self.prices.find_since(now - lookback).await?;

        let mut snapshot = SignalSnapshot::new(now);
        for instrument in &self.tracked {
            let series: Vec<f64> = apr_history
                .iter()
                .filter_map(|s| s.value(&instrument.heading))
                .collect();
            let apr = match smooth_window(&series, self.apr_window, self.apr_alpha) {
                Ok(smoothed) => Some(smoothed.value),
                Err(e) => {
                    warn!(instrument = %instrument.heading, error = %e, "APR not smoothed");
                    None
                }
            };
            snapshot.insert(instrument.apr_column.clone(), apr);
        }

        for instrument in &self.tracked {
            let volatility =
                match estimate_volatility(&price_history, &instrument.pair, now, &self.volatility)
                {
                    Ok(v) => Some(v),
                    Err(e) => {
                        warn!(column = %instrument.volatility_column, error = %e, "Volatility not computed");
                        None
                    }
                };
            snapshot.insert(instrument.volatility_column.clone(), volatility);
        }
        Ok(snapshot)
    }

    /// Computes and appends one signal row.
    pub async fn collect(&self, now: DateTime<Utc>) -> Result<SignalSnapshot> {
        let snapshot = self.compute(now).await?;
        self.signals.save(&snapshot).await?;
        info!(
            columns = snapshot.values.len(),
            empty = snapshot.values.values().filter(|v| v.is_none()).count(),
            "Signals stored"
        );
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use crate::error::DataError;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use clmm_keeper_domain::DomainError;
    use tempfile::TempDir;

    fn instruments() -> Vec<InstrumentConfig> {
        vec![
            InstrumentConfig::new("0x01", "Aggressive", "ZRO-ETH 2%", Some("ZRO-ETH")),
            InstrumentConfig::new("0x02", "Aggressive", "weETH-ETH 1-tick", None),
            InstrumentConfig::new("0x03", "Aggressive", "WBTC-ETH 1%", Some("ETH-BTC")),
        ]
    }

    fn store(dir: &TempDir) -> HistoryStore {
        HistoryStore::new(
            StorageConfig {
                prices_path: dir.path().join("prices.csv"),
                apr_path: dir.path().join("apr.csv"),
                signals_path: dir.path().join("pair_data.csv"),
            },
            vec!["ETH".into(), "BTC".into(), "ZRO".into()],
            instruments(),
        )
    }

    fn at(minute: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap() + Duration::minutes(minute)
    }

    #[tokio::test]
    async fn test_signal_row_smooths_last_window() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let aprs = store.aprs();
        for (i, apr) in [9999.0, 400.0, 410.0, 420.0, 430.0, 440.0, 450.0]
            .into_iter()
            .enumerate()
        {
            aprs.save(&AprSample::new(at(i as i64 * 10)).with_value("ZRO-ETH 2%", Some(apr)))
                .await
                .unwrap();
        }
        let prices = store.prices();
        for (i, eth) in [100.0, 101.0, 99.0, 102.0].into_iter().enumerate() {
            prices
                .save(
                    &PriceSample::new(at(i as i64 * 10))
                        .with_price("ETH", eth)
                        .with_price("BTC", 1.0)
                        .with_price("ZRO", 2.0),
                )
                .await
                .unwrap();
        }

        let collector = SignalCollector::new(
            &store,
            &instruments(),
            &PairRegistry::default(),
            VolatilityConfig::default(),
            &StrategyConfig::default(),
        )
        .unwrap();
        let snapshot = collector.collect(at(60)).await.unwrap();

        let expected_apr =
            clmm_keeper_domain::math::ewma(&[400.0, 410.0, 420.0, 430.0, 440.0, 450.0], 0.4)
                .unwrap();
        let apr = snapshot.value("ZRO-ETH 2% APR").unwrap();
        assert!((apr - expected_apr).abs() < 1e-9);
        assert!(snapshot.value("ZRO-ETH Volatility").is_some());
        assert!(snapshot.value("ETH-BTC Volatility").is_some());
        assert_eq!(snapshot.value("WBTC-ETH 1% APR"), None);
        assert!(!snapshot.values.contains_key("weETH-ETH 1-tick APR"));

        let stored = store.signals().latest().await.unwrap().unwrap();
        assert_eq!(stored.timestamp, at(60));
        assert_eq!(
            stored.value("ZRO-ETH 2% APR"),
            Some((expected_apr * 100.0).round() / 100.0)
        );
    }

    #[tokio::test]
    async fn test_insufficient_prices_leave_cell_empty() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let collector = SignalCollector::new(
            &store,
            &instruments(),
            &PairRegistry::default(),
            VolatilityConfig::default(),
            &StrategyConfig::default(),
        )
        .unwrap();
        let snapshot = collector.compute(at(0)).await.unwrap();
        assert_eq!(snapshot.value("ZRO-ETH Volatility"), None);
        assert_eq!(snapshot.values.len(), 4);
    }

    #[test]
    fn test_unknown_pair_is_rejected() {
        let dir = TempDir::new().unwrap();
        let instruments = vec![InstrumentConfig::new("0x9", "Aggressive", "X", Some("DOGE-ETH"))];
        let result = SignalCollector::new(
            &store(&dir),
            &instruments,
            &PairRegistry::default(),
            VolatilityConfig::default(),
            &StrategyConfig::default(),
        );
        assert!(matches!(
            result,
            Err(DataError::Domain(DomainError::InvalidPair(_)))
        ));
    }

    struct FixedPrices;

    #[async_trait]
    impl PriceFeed for FixedPrices {
        fn assets(&self) -> Vec<String> {
            vec!["ETH".into(), "BTC".into(), "ZRO".into()]
        }

        async fn fetch_prices(&self) -> Result<PriceSample> {
            Ok(PriceSample::new(at(0))
                .with_price("ETH", 3000.0)
                .with_price("BTC", 60000.0)
                .with_price("ZRO", 3.0))
        }
    }

    struct FailingYields;

    #[async_trait]
    impl YieldFeed for FailingYields {
        async fn fetch_yields(&self, _instruments: &[InstrumentConfig]) -> Result<AprSample> {
            Err(DataError::Feed {
                feed: "test",
                reason: "offline".into(),
            })
        }
    }

    #[tokio::test]
    async fn test_feed_collector_stores_only_successful_reads() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let collector = FeedCollector::new(
            Arc::new(FixedPrices),
            Arc::new(FailingYields),
            &store,
            instruments(),
        );

        let prices = collector.fetch_prices().await.unwrap();
        collector.store_prices(&prices).await.unwrap();
        let yields = collector.fetch_yields().await;
        assert!(matches!(&yields, Err(e) if e.is_transient()));

        assert_eq!(store.prices().find_all().await.unwrap().len(), 1);
        assert!(store.aprs().find_all().await.unwrap().is_empty());
    }
}
