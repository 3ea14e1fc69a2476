//! Computed-signal history.

use super::table::CsvTable;
use crate::error::Result;
use async_trait::async_trait;
use clmm_keeper_domain::entities::SignalSnapshot;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Source of the most recent computed signal row.
#[async_trait]
pub trait SignalSource: Send + Sync {
    /// The latest row, or `None` when nothing has been computed yet.
    async fn latest_signal(&self) -> Result<Option<SignalSnapshot>>;
}

/// Append-only history of smoothed APR and volatility values.
///
/// APR columns are written with 2 decimals and volatility columns with 6.
#[derive(Debug, Clone)]
pub struct SignalRepository {
    table: CsvTable,
    volatility_columns: BTreeSet<String>,
}

impl SignalRepository {
    pub fn new(
        path: impl Into<PathBuf>,
        apr_columns: Vec<String>,
        volatility_columns: Vec<String>,
    ) -> Self {
        let columns = apr_columns
            .into_iter()
            .chain(volatility_columns.iter().cloned())
            .collect();
        Self {
            table: CsvTable::new(path, columns),
            volatility_columns: volatility_columns.into_iter().collect(),
        }
    }

    pub async fn init(&self) -> Result<()> {
        self.table.ensure_header().await
    }

    pub fn columns(&self) -> &[String] {
        self.table.columns()
    }

    pub async fn save(&self, snapshot: &SignalSnapshot) -> Result<()> {
        let cells = self
            .table
            .columns()
            .iter()
            .map(|column| match snapshot.value(column) {
                Some(v) if self.volatility_columns.contains(column) => format!("{v:.6}"),
                Some(v) => format!("{v:.2}"),
                None => String::new(),
            })
            .collect();
        self.table.append(snapshot.timestamp, cells).await
    }

    pub async fn latest(&self) -> Result<Option<SignalSnapshot>> {
        let Some(row) = self.table.read_last().await? else {
            return Ok(None);
        };
        let mut snapshot = SignalSnapshot::new(row.timestamp);
        for column in self.table.columns() {
            snapshot.insert(column.clone(), row.number(column));
        }
        Ok(Some(snapshot))
    }
}

#[async_trait]
impl SignalSource for SignalRepository {
    async fn latest_signal(&self) -> Result<Option<SignalSnapshot>> {
        self.latest().await
    }
}
