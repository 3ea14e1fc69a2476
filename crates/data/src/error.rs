//! Error types for persistence and feed access.

use clmm_keeper_domain::DomainError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading or appending time series, or fetching feeds.
#[derive(Error, Debug)]
pub enum DataError {
    /// Filesystem failure on a history file.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The CSV reader or writer failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// An existing history file was written with different columns.
    #[error("schema mismatch in {path}: expected {expected:?}, found {found:?}")]
    SchemaMismatch {
        path: PathBuf,
        expected: Vec<String>,
        found: Vec<String>,
    },

    /// A row could not be decoded.
    #[error("malformed row {row} in {path}: {reason}")]
    MalformedRow {
        path: PathBuf,
        row: usize,
        reason: String,
    },

    /// HTTP transport or status failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A feed answered with a payload we could not use.
    #[error("unexpected response from {feed}: {reason}")]
    Feed { feed: &'static str, reason: String },

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl DataError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether retrying the same read later may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            DataError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            DataError::Io { .. } | DataError::Feed { .. } => true,
            _ => false,
        }
    }
}

/// Result alias for data operations.
pub type Result<T> = std::result::Result<T, DataError>;
