//! 1inch swap API client.

use crate::error::{ProtocolError, Result};
use crate::types::{SwapRequest, SwapTransaction};
use crate::SwapAggregator;
use async_trait::async_trait;
use primitive_types::U256;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct SwapResponse {
    tx: RawTransaction,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTransaction {
    from: String,
    to: String,
    data: String,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    gas: Option<u64>,
    #[serde(default)]
    gas_price: Option<String>,
}

impl RawTransaction {
    fn into_transaction(self) -> Result<SwapTransaction> {
        let parse = |field: &'static str, raw: &str| {
            U256::from_dec_str(raw).map_err(|e| ProtocolError::Read {
                operation: "swap quote",
                reason: format!("bad {field} {raw:?}: {e:?}"),
            })
        };
        let value = match self.value.as_deref() {
            Some(raw) if !raw.is_empty() => parse("value", raw)?,
            _ => U256::zero(),
        };
        let gas_price = match self.gas_price.as_deref() {
            Some(raw) if !raw.is_empty() => Some(parse("gasPrice", raw)?),
            _ => None,
        };
        Ok(SwapTransaction {
            from: self.from,
            to: self.to,
            data: self.data,
            value,
            gas: self.gas.filter(|g| *g > 0),
            gas_price,
        })
    }
}

/// Builds swap transactions through the aggregator's `/swap` endpoint.
pub struct OneInchClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl OneInchClient {
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Self {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|err| {
                warn!(error = %err, "Failed to build HTTP client, using defaults");
                Client::new()
            });
        Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl SwapAggregator for OneInchClient {
    async fn build_swap(&self, request: &SwapRequest) -> Result<SwapTransaction> {
        let url = format!("{}/swap", self.base_url);
        info!(
            src = %request.src,
            dst = %request.dst,
            amount = %request.amount,
            "Requesting swap transaction"
        );

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.api_key)
            .header("accept", "application/json")
            .query(&request.query_params())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProtocolError::Aggregator {
                status: status.as_u16(),
                body,
            });
        }

        let swap: SwapResponse = response.json().await?;
        debug!(to = %swap.tx.to, gas = ?swap.tx.gas, "Swap transaction built");
        swap.tx.into_transaction()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_swap_response() {
        let body = r#"{
            "dstAmount": "123456",
            "tx": {
                "from": "0x0000000000000000000000000000000000000001",
                "to": "0x111111125421ca6dc452d289314280a0f8842a65",
                "data": "0x07ed2379",
                "value": "0",
                "gas": 254000,
                "gasPrice": "10000000"
            }
        }"#;
        let swap: SwapResponse = serde_json::from_str(body).unwrap();
        let tx = swap.tx.into_transaction().unwrap();
        assert_eq!(tx.value, U256::zero());
        assert_eq!(tx.gas, Some(254_000));
        assert_eq!(tx.gas_price, Some(U256::from(10_000_000u64)));
        assert_eq!(tx.data, "0x07ed2379");
    }

    #[test]
    fn test_bad_value_is_rejected() {
        let raw = RawTransaction {
            from: "0x1".into(),
            to: "0x2".into(),
            data: "0x".into(),
            value: Some("lots".into()),
            gas: None,
            gas_price: None,
        };
        assert!(matches!(
            raw.into_transaction(),
            Err(ProtocolError::Read { .. })
        ));
    }
}
