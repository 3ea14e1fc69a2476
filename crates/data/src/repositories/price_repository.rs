//! Spot price history.

use super::table::CsvTable;
use crate::error::Result;
use chrono::{DateTime, Utc};
use clmm_keeper_domain::entities::PriceSample;
use std::path::PathBuf;
use tracing::debug;

/// Append-only history of USD spot prices, one column per asset.
#[derive(Debug, Clone)]
pub struct PriceRepository {
    table: CsvTable,
}

impl PriceRepository {
    pub fn new(path: impl Into<PathBuf>, assets: Vec<String>) -> Self {
        Self {
            table: CsvTable::new(path, assets),
        }
    }

    /// Creates the file with its header if needed.
    pub async fn init(&self) -> Result<()> {
        self.table.ensure_header().await
    }

    /// Appends a sample. Assets the sample lacks are written as empty cells.
    pub async fn save(&self, sample: &PriceSample) -> Result<()> {
        let cells = self
            .table
            .columns()
            .iter()
            .map(|asset| sample.price(asset).map(|p| p.to_string()).unwrap_or_default())
            .collect();
        self.table.append(sample.timestamp, cells).await
    }

    /// Reads the full history in file order.
    pub async fn find_all(&self) -> Result<Vec<PriceSample>> {
        let rows = self.table.read_rows().await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let mut sample = PriceSample::new(row.timestamp);
                for asset in self.table.columns() {
                    match row.number(asset) {
                        Some(price) => sample = sample.with_price(asset.clone(), price),
                        None => debug!(asset = %asset, timestamp = %row.timestamp, "Missing price"),
                    }
                }
                sample
            })
            .collect())
    }

    /// Samples no older than `since`.
    pub async fn find_since(&self, since: DateTime<Utc>) -> Result<Vec<PriceSample>> {
        Ok(self
            .find_all()
            .await?
            .into_iter()
            .filter(|s| s.timestamp >= since)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tempfile::TempDir;

    fn repo(dir: &TempDir) -> PriceRepository {
        PriceRepository::new(
            dir.path().join("prices.csv"),
            vec!["ARB".into(), "ETH".into(), "BTC".into(), "ZRO".into()],
        )
    }

    #[tokio::test]
    async fn test_save_and_find() {
        let dir = TempDir::new().unwrap();
        let repo = repo(&dir);
        let t0 = Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap();

        repo.save(
            &PriceSample::new(t0)
                .with_price("ARB", 0.75)
                .with_price("ETH", 3400.5)
                .with_price("BTC", 62000.0)
                .with_price("ZRO", 3.1),
        )
        .await
        .unwrap();
        repo.save(&PriceSample::new(t0 + Duration::minutes(1)).with_price("ETH", 3401.0))
            .await
            .unwrap();

        let all = repo.find_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].price("ZRO"), Some(3.1));
        assert_eq!(all[1].price("ETH"), Some(3401.0));
        assert_eq!(all[1].price("BTC"), None);

        let recent = repo.find_since(t0 + Duration::seconds(30)).await.unwrap();
        assert_eq!(recent.len(), 1);
    }

    #[tokio::test]
    async fn test_init_writes_header() {
        let dir = TempDir::new().unwrap();
        let repo = repo(&dir);
        repo.init().await.unwrap();
        let content = std::fs::read_to_string(dir.path().join("prices.csv")).unwrap();
        assert_eq!(content.trim_end(), "Timestamp,ARB,ETH,BTC,ZRO");
    }
}
