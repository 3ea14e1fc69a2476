//! Spot prices from an exchange ticker API and a secondary coin API.

use super::PriceFeed;
use crate::config::FeedsConfig;
use crate::error::{DataError, Result};
use async_trait::async_trait;
use chrono::Utc;
use clmm_keeper_domain::entities::PriceSample;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct TickerPrice {
    price: String,
}

#[derive(Debug, Deserialize)]
struct CoinResponse {
    market_data: MarketData,
}

#[derive(Debug, Deserialize)]
struct MarketData {
    current_price: CurrentPrice,
}

#[derive(Debug, Deserialize)]
struct CurrentPrice {
    usd: f64,
}

/// Prices exchange-listed assets from `ticker/price` and the rest from CoinGecko.
pub struct SpotPriceProvider {
    http: Client,
    config: FeedsConfig,
    coingecko_api_key: Option<String>,
}

impl SpotPriceProvider {
    #[must_use]
    pub fn new(config: FeedsConfig, coingecko_api_key: Option<String>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .unwrap_or_else(|err| {
                warn!(error = %err, "Failed to build HTTP client, using defaults");
                Client::new()
            });
        Self {
            http,
            config,
            coingecko_api_key,
        }
    }

    async fn ticker_price(&self, symbol: &str) -> Result<f64> {
        let url = format!("{}/ticker/price", self.config.exchange_url);
        let ticker: TickerPrice = self
            .http
            .get(&url)
            .query(&[("symbol", symbol)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        parse_price("exchange", symbol, &ticker.price)
    }

    async fn coin_price(&self, id: &str) -> Result<f64> {
        let url = format!("{}/coins/{}", self.config.coingecko_url, id);
        let mut request = self.http.get(&url).header("accept", "application/json");
        if let Some(key) = &self.coingecko_api_key {
            request = request.header("x-cg-demo-api-key", key);
        }
        let coin: CoinResponse = request.send().await?.error_for_status()?.json().await?;
        let price = coin.market_data.current_price.usd;
        if price.is_finite() && price > 0.0 {
            Ok(price)
        } else {
            Err(DataError::Feed {
                feed: "coingecko",
                reason: format!("non-positive price {price} for {id}"),
            })
        }
    }
}

fn parse_price(feed: &'static str, symbol: &str, raw: &str) -> Result<f64> {
    match raw.parse::<f64>() {
        Ok(price) if price.is_finite() && price > 0.0 => Ok(price),
        _ => Err(DataError::Feed {
            feed,
            reason: format!("bad price {raw:?} for {symbol}"),
        }),
    }
}

#[async_trait]
impl PriceFeed for SpotPriceProvider {
    fn assets(&self) -> Vec<String> {
        self.config.assets()
    }

    async fn fetch_prices(&self) -> Result<PriceSample> {
        let mut sample = PriceSample::new(Utc::now());
        for symbol in &self.config.exchange_symbols {
            let price = self.ticker_price(symbol).await?;
            sample = sample.with_price(self.config.asset_for_symbol(symbol), price);
        }
        for coin in &self.config.coingecko_assets {
            let price = self.coin_price(&coin.id).await?;
            sample = sample.with_price(coin.asset.clone(), price);
        }
        debug!(prices = ?sample.prices, "Fetched spot prices");
        Ok(sample)
    }
}
