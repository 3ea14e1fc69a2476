//! Error types for on-chain and aggregator access.

use thiserror::Error;

/// Errors raised by the pool, position manager, wallet and swap collaborators.
///
/// A missing position is not an error: lookups return `Ok(None)`.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// A contract read failed.
    #[error("read {operation} failed: {reason}")]
    Read {
        operation: &'static str,
        reason: String,
    },

    /// A transaction could not be submitted.
    #[error("write {operation} failed: {reason}")]
    Write {
        operation: &'static str,
        reason: String,
    },

    /// A transaction was mined but reverted.
    #[error("{operation} reverted in {hash}")]
    Reverted { operation: &'static str, hash: String },

    /// A submitted transaction did not confirm in time; it may still land.
    #[error("{operation} not confirmed: {hash}")]
    Unconfirmed { operation: &'static str, hash: String },

    /// An individual call exceeded its timeout.
    #[error("{operation} timed out")]
    Timeout { operation: &'static str },

    /// The swap aggregator answered with an error status.
    #[error("aggregator returned {status}: {body}")]
    Aggregator { status: u16, body: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Addresses, keys or URLs that do not parse.
    #[error("invalid configuration for {field}: {reason}")]
    Configuration { field: &'static str, reason: String },
}

impl ProtocolError {
    pub fn config(field: &'static str, reason: impl ToString) -> Self {
        Self::Configuration {
            field,
            reason: reason.to_string(),
        }
    }

    /// Whether repeating the same call may succeed.
    ///
    /// Reverts and unconfirmed transactions are never retried: the chain state
    /// must be re-read first.
    pub fn is_transient(&self) -> bool {
        match self {
            ProtocolError::Read { .. }
            | ProtocolError::Write { .. }
            | ProtocolError::Timeout { .. } => true,
            ProtocolError::Aggregator { status, .. } => *status == 429 || *status >= 500,
            ProtocolError::Http(e) => e.is_timeout() || e.is_connect(),
            ProtocolError::Reverted { .. }
            | ProtocolError::Unconfirmed { .. }
            | ProtocolError::Configuration { .. } => false,
        }
    }
}

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ProtocolError::Timeout { operation: "slot0" }.is_transient());
        assert!(
            ProtocolError::Aggregator {
                status: 503,
                body: String::new()
            }
            .is_transient()
        );
        assert!(
            !ProtocolError::Aggregator {
                status: 400,
                body: "insufficient liquidity".into()
            }
            .is_transient()
        );
        assert!(
            !ProtocolError::Unconfirmed {
                operation: "mint",
                hash: "0xabc".into()
            }
            .is_transient()
        );
    }
}
