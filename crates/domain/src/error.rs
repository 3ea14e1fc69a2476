//! Domain error types.

use thiserror::Error;

/// Errors raised by the pure signal and range computations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Too few samples to smooth or to derive a volatility from.
    #[error("insufficient data: need at least {required} samples, got {actual}")]
    InsufficientData {
        /// Minimum number of samples required.
        required: usize,
        /// Number of samples available.
        actual: usize,
    },

    /// The signal sample is older than the staleness bound.
    #[error("stale signal: {age_secs}s old, bound is {bound_secs}s")]
    StaleSignal {
        /// Age of the sample in seconds.
        age_secs: i64,
        /// Configured staleness bound in seconds.
        bound_secs: i64,
    },

    /// The requested trading pair is not configured.
    #[error("invalid pair: {0}")]
    InvalidPair(String),

    /// A configuration value is malformed or out of bounds.
    #[error("invalid configuration for {field}: {reason}")]
    InvalidConfiguration {
        /// Offending configuration field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// A price is zero, negative or not finite.
    #[error("invalid price: {0}")]
    InvalidPrice(f64),
}

impl DomainError {
    /// Shorthand for an [`DomainError::InvalidConfiguration`].
    pub fn config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            field,
            reason: reason.into(),
        }
    }
}

/// Result alias for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;
