//! Append-only CSV table with a fixed header.

use crate::error::{DataError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Name of the leading column of every history file.
pub const TIMESTAMP_COLUMN: &str = "Timestamp";

/// Formats a row timestamp as RFC 3339 with milliseconds, e.g. `2024-07-01T12:00:00.000Z`.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// One decoded row: its timestamp and the raw cell of every named column.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub timestamp: DateTime<Utc>,
    pub cells: BTreeMap<String, String>,
}

impl Row {
    /// Numeric value of a column. Empty or absent cells are `None`.
    pub fn number(&self, column: &str) -> Option<f64> {
        let cell = self.cells.get(column)?.trim();
        if cell.is_empty() {
            return None;
        }
        match cell.parse::<f64>() {
            Ok(v) if v.is_finite() => Some(v),
            _ => {
                warn!(column, cell, "Ignoring non-numeric cell");
                None
            }
        }
    }
}

/// A CSV file whose first row is `Timestamp` followed by `columns`.
#[derive(Debug, Clone)]
pub struct CsvTable {
    path: PathBuf,
    columns: Vec<String>,
}

impl CsvTable {
    pub fn new(path: impl Into<PathBuf>, columns: Vec<String>) -> Self {
        Self {
            path: path.into(),
            columns,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    fn header(&self) -> Vec<String> {
        std::iter::once(TIMESTAMP_COLUMN.to_string())
            .chain(self.columns.iter().cloned())
            .collect()
    }

    /// Writes the header when the file does not exist yet, otherwise checks it.
    pub async fn ensure_header(&self) -> Result<()> {
        let exists = fs::try_exists(&self.path)
            .await
            .map_err(|e| DataError::io(&self.path, e))?;

        if !exists {
            if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| DataError::io(parent, e))?;
            }
            let header = encode_record(&self.header())?;
            fs::write(&self.path, header)
                .await
                .map_err(|e| DataError::io(&self.path, e))?;
            info!(path = %self.path.display(), "Created history file");
            return Ok(());
        }

        let found = self.read_header().await?;
        if found != self.header() {
            return Err(DataError::SchemaMismatch {
                path: self.path.clone(),
                expected: self.header(),
                found,
            });
        }
        Ok(())
    }

    async fn read_header(&self) -> Result<Vec<String>> {
        let bytes = fs::read(&self.path)
            .await
            .map_err(|e| DataError::io(&self.path, e))?;
        let mut reader = ReaderBuilder::new().from_reader(bytes.as_slice());
        Ok(reader.headers()?.iter().map(str::to_string).collect())
    }

    /// Appends one row; `cells` follow the column order.
    pub async fn append(&self, timestamp: DateTime<Utc>, cells: Vec<String>) -> Result<()> {
        if cells.len() != self.columns.len() {
            return Err(DataError::MalformedRow {
                path: self.path.clone(),
                row: 0,
                reason: format!(
                    "expected {} cells, got {}",
                    self.columns.len(),
                    cells.len()
                ),
            });
        }
        self.ensure_header().await?;

        let mut record = Vec::with_capacity(cells.len() + 1);
        record.push(format_timestamp(timestamp));
        record.extend(cells);
        let line = encode_record(&record)?;

        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| DataError::io(&self.path, e))?;
        file.write_all(&line)
            .await
            .map_err(|e| DataError::io(&self.path, e))?;
        file.flush()
            .await
            .map_err(|e| DataError::io(&self.path, e))?;

        debug!(path = %self.path.display(), "Row appended");
        Ok(())
    }

    /// Reads every row in file order. A missing file reads as empty.
    pub async fn read_rows(&self) -> Result<Vec<Row>> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(DataError::io(&self.path, e)),
        };

        let mut reader = ReaderBuilder::new()
            .flexible(true)
            .from_reader(bytes.as_slice());
        let headers: StringRecord = reader.headers()?.clone();

        let mut rows = Vec::new();
        for (index, record) in reader.records().enumerate() {
            let record = record?;
            rows.push(self.decode(&headers, &record, index + 1)?);
        }
        Ok(rows)
    }

    /// Reads the most recent row.
    pub async fn read_last(&self) -> Result<Option<Row>> {
        Ok(self.read_rows().await?.pop())
    }

    fn decode(&self, headers: &StringRecord, record: &StringRecord, row: usize) -> Result<Row> {
        let mut cells = BTreeMap::new();
        let mut timestamp = None;
        for (name, value) in headers.iter().zip(record.iter()) {
            if name == TIMESTAMP_COLUMN {
                let parsed = DateTime::parse_from_rfc3339(value).map_err(|e| {
                    DataError::MalformedRow {
                        path: self.path.clone(),
                        row,
                        reason: format!("bad timestamp {value:?}: {e}"),
                    }
                })?;
                timestamp = Some(parsed.with_timezone(&Utc));
            } else {
                cells.insert(name.to_string(), value.to_string());
            }
        }
        let timestamp = timestamp.ok_or_else(|| DataError::MalformedRow {
            path: self.path.clone(),
            row,
            reason: "missing timestamp".to_string(),
        })?;
        Ok(Row { timestamp, cells })
    }
}

fn encode_record(record: &[String]) -> Result<Vec<u8>> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(record)?;
    writer
        .into_inner()
        .map_err(|e| DataError::Csv(csv::Error::from(e.into_error())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn table(dir: &TempDir) -> CsvTable {
        CsvTable::new(
            dir.path().join("nested/history.csv"),
            vec!["A".to_string(), "B".to_string()],
        )
    }

    #[tokio::test]
    async fn test_header_is_written_once() {
        let dir = TempDir::new().unwrap();
        let table = table(&dir);
        let ts = Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap();

        table
            .append(ts, vec!["1.5".to_string(), String::new()])
            .await
            .unwrap();
        table
            .append(ts, vec!["2".to_string(), "3".to_string()])
            .await
            .unwrap();

        let content = std::fs::read_to_string(table.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "Timestamp,A,B");
        assert_eq!(lines[1], "2024-07-01T12:00:00.000Z,1.5,");
        assert_eq!(lines.len(), 3);
    }

    #[tokio::test]
    async fn test_read_rows_decodes_cells() {
        let dir = TempDir::new().unwrap();
        let table = table(&dir);
        let ts = Utc.with_ymd_and_hms(2024, 7, 1, 12, 10, 0).unwrap();
        table
            .append(ts, vec!["4.25".to_string(), String::new()])
            .await
            .unwrap();

        let rows = table.read_rows().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].timestamp, ts);
        assert_eq!(rows[0].number("A"), Some(4.25));
        assert_eq!(rows[0].number("B"), None);
        assert_eq!(rows[0].number("C"), None);
    }

    #[tokio::test]
    async fn test_missing_file_reads_empty() {
        let dir = TempDir::new().unwrap();
        assert!(table(&dir).read_last().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_schema_mismatch_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.csv");
        std::fs::write(&path, "Timestamp,X\n").unwrap();
        let table = CsvTable::new(path, vec!["A".to_string()]);
        let result = table.ensure_header().await;
        assert!(matches!(result, Err(DataError::SchemaMismatch { .. })));
    }

    #[tokio::test]
    async fn test_wrong_cell_count_is_rejected() {
        let dir = TempDir::new().unwrap();
        let result = table(&dir).append(Utc::now(), vec!["1".to_string()]).await;
        assert!(matches!(result, Err(DataError::MalformedRow { .. })));
    }

    #[tokio::test]
    async fn test_bad_timestamp_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.csv");
        std::fs::write(&path, "Timestamp,A\nyesterday,1\n").unwrap();
        let table = CsvTable::new(path, vec!["A".to_string()]);
        assert!(matches!(
            table.read_rows().await,
            Err(DataError::MalformedRow { row: 1, .. })
        ));
    }
}
