//! Yield (APR) history.

use super::table::CsvTable;
use crate::error::Result;
use clmm_keeper_domain::entities::AprSample;
use std::path::PathBuf;

/// Append-only history of yield readings, one column per instrument heading.
#[derive(Debug, Clone)]
pub struct AprRepository {
    table: CsvTable,
}

impl AprRepository {
    pub fn new(path: impl Into<PathBuf>, headings: Vec<String>) -> Self {
        Self {
            table: CsvTable::new(path, headings),
        }
    }

    pub async fn init(&self) -> Result<()> {
        self.table.ensure_header().await
    }

    /// Appends a sample. Missing readings stay empty; nothing is filled in.
    pub async fn save(&self, sample: &AprSample) -> Result<()> {
        let cells = self
            .table
            .columns()
            .iter()
            .map(|h| sample.value(h).map(|v| v.to_string()).unwrap_or_default())
            .collect();
        self.table.append(sample.timestamp, cells).await
    }

    pub async fn find_all(&self) -> Result<Vec<AprSample>> {
        let rows = self.table.read_rows().await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                self.table
                    .columns()
                    .iter()
                    .fold(AprSample::new(row.timestamp), |sample, heading| {
                        let value = row.number(heading);
                        sample.with_value(heading.clone(), value)
                    })
            })
            .collect())
    }

    /// Present readings of one instrument, oldest first.
    pub async fn series(&self, heading: &str) -> Result<Vec<f64>> {
        Ok(self
            .find_all()
            .await?
            .iter()
            .filter_map(|s| s.value(heading))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_values_stay_empty() {
        let dir = TempDir::new().unwrap();
        let repo = AprRepository::new(
            dir.path().join("apr.csv"),
            vec!["ZRO-ETH 2%".into(), "ETH-ARB 2%".into()],
        );
        repo.save(
            &AprSample::new(Utc::now())
                .with_value("ZRO-ETH 2%", Some(612.4))
                .with_value("ETH-ARB 2%", None),
        )
        .await
        .unwrap();
        repo.save(&AprSample::new(Utc::now()).with_value("ZRO-ETH 2%", Some(580.0)))
            .await
            .unwrap();

        let content = std::fs::read_to_string(dir.path().join("apr.csv")).unwrap();
        assert!(content.lines().nth(1).unwrap().ends_with(",612.4,"));

        assert_eq!(repo.series("ZRO-ETH 2%").await.unwrap(), vec![612.4, 580.0]);
        assert!(repo.series("ETH-ARB 2%").await.unwrap().is_empty());
    }
}
