//! Configuration of the tracked instruments, history files and feeds.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A yield instrument tracked in the APR history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentConfig {
    /// Pool id as published by the yield feed.
    pub id: String,
    /// Name of the recommended range whose `lpApr` is recorded.
    pub range_name: String,
    /// Column heading in the APR history.
    pub heading: String,
    /// Pair whose volatility is reported next to this instrument's smoothed APR.
    /// Instruments without one are recorded but not smoothed into signals.
    #[serde(default)]
    pub volatility_pair: Option<String>,
}

impl InstrumentConfig {
    pub fn new(id: &str, range_name: &str, heading: &str, volatility_pair: Option<&str>) -> Self {
        Self {
            id: id.to_string(),
            range_name: range_name.to_string(),
            heading: heading.to_string(),
            volatility_pair: volatility_pair.map(str::to_string),
        }
    }

    /// Column heading of the smoothed APR in the signal history.
    pub fn apr_signal_column(&self) -> String {
        format!("{} APR", self.heading)
    }
}

/// Column heading of a pair's volatility in the signal history.
pub fn volatility_signal_column(pair: &str) -> String {
    format!("{pair} Volatility")
}

/// The instruments tracked by the live deployment.
pub fn default_instruments() -> Vec<InstrumentConfig> {
    const AGGRESSIVE: &str = "Aggressive";
    vec![
        InstrumentConfig::new(
            "0x2760cc828b2e4d04f8ec261a5335426bb22d9291",
            AGGRESSIVE,
            "WBTC-ETH 1%",
            Some("ETH-BTC"),
        ),
        InstrumentConfig::new(
            "0x2d4bfb17db454cf582a74902c91fb09a3883a5cc",
            AGGRESSIVE,
            "weETH-ETH 1-tick",
            None,
        ),
        InstrumentConfig::new(
            "0x562d29b54d2c57f8620c920415c4dceadd6de2d2",
            AGGRESSIVE,
            "USDC.e-USDC 1-tick",
            None,
        ),
        InstrumentConfig::new(
            "0x30afbcf9458c3131a6d051c621e307e6278e4110",
            AGGRESSIVE,
            "ETH-USDC 2%",
            Some("ETH-USDC"),
        ),
        InstrumentConfig::new(
            "0x30afbcf9458c3131a6d051c621e307e6278e4110",
            "Insane",
            "ETH-USDC 1-tick",
            None,
        ),
        InstrumentConfig::new(
            "0x2ed095289b2116d7a3399e278d603a4e4015b19d",
            AGGRESSIVE,
            "wstETH-ETH 1-tick",
            None,
        ),
        InstrumentConfig::new(
            "0x6ce9bc2d8093d32adde4695a4530b96558388f7e",
            AGGRESSIVE,
            "ETH-ARB 2%",
            Some("ETH-ARB"),
        ),
        InstrumentConfig::new(
            "0xee5f2e39d8abf28e449327bfd44317fc500eb4d8",
            AGGRESSIVE,
            "ARB-USDC 2%",
            Some("ARB-USDC"),
        ),
        InstrumentConfig::new(
            "0x05ba720fc96ea8969f86d7a0b0767bb8dc265232",
            AGGRESSIVE,
            "ZRO-ETH 2%",
            Some("ZRO-ETH"),
        ),
    ]
}

/// Locations of the append-only history files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub prices_path: PathBuf,
    pub apr_path: PathBuf,
    pub signals_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            prices_path: PathBuf::from("data/prices.csv"),
            apr_path: PathBuf::from("data/lp_apr.csv"),
            signals_path: PathBuf::from("data/pair_data.csv"),
        }
    }
}

/// An asset priced through the secondary price API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinGeckoAsset {
    /// Column name in the price history.
    pub asset: String,
    /// CoinGecko coin id.
    pub id: String,
}

/// Endpoints and symbols of the external feeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedsConfig {
    /// Exchange REST base URL.
    pub exchange_url: String,
    /// Exchange tickers; the asset name is the ticker minus `quote_suffix`.
    pub exchange_symbols: Vec<String>,
    pub quote_suffix: String,
    /// Secondary price API base URL.
    pub coingecko_url: String,
    pub coingecko_assets: Vec<CoinGeckoAsset>,
    /// Yield feed JSON document.
    pub yield_url: String,
    pub request_timeout_secs: u64,
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            exchange_url: "https://api.binance.com/api/v3".to_string(),
            exchange_symbols: vec![
                "ARBUSDT".to_string(),
                "ETHUSDT".to_string(),
                "BTCUSDT".to_string(),
            ],
            quote_suffix: "USDT".to_string(),
            coingecko_url: "https://api.coingecko.com/api/v3".to_string(),
            coingecko_assets: vec![CoinGeckoAsset {
                asset: "ZRO".to_string(),
                id: "layerzero".to_string(),
            }],
            yield_url: "https://kingdom-api-backups.s3.amazonaws.com/ramses_mixed-pairs.json"
                .to_string(),
            request_timeout_secs: 10,
        }
    }
}

impl FeedsConfig {
    /// Asset columns of the price history, in fetch order.
    pub fn assets(&self) -> Vec<String> {
        self.exchange_symbols
            .iter()
            .map(|s| self.asset_for_symbol(s))
            .chain(self.coingecko_assets.iter().map(|a| a.asset.clone()))
            .collect()
    }

    pub fn asset_for_symbol(&self, symbol: &str) -> String {
        symbol
            .strip_suffix(&self.quote_suffix)
            .unwrap_or(symbol)
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_assets_match_history_columns() {
        assert_eq!(FeedsConfig::default().assets(), vec!["ARB", "ETH", "BTC", "ZRO"]);
    }

    #[test]
    fn test_signal_columns() {
        let instruments = default_instruments();
        let zro = instruments
            .iter()
            .find(|i| i.heading == "ZRO-ETH 2%")
            .unwrap();
        assert_eq!(zro.apr_signal_column(), "ZRO-ETH 2% APR");
        assert_eq!(
            volatility_signal_column(zro.volatility_pair.as_deref().unwrap()),
            "ZRO-ETH Volatility"
        );
        assert_eq!(
            instruments.iter().filter(|i| i.volatility_pair.is_some()).count(),
            5
        );
    }
}
