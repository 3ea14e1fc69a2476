//! Persistence and feed access for the range keeper.
//!
//! This crate provides:
//! - Append-only CSV histories for prices, yields and computed signals
//! - HTTP price and yield feeds
//! - Collection cycles that turn feed readings into signal rows

/// Feed, instrument and storage configuration.
pub mod config;
/// Collection cycles.
pub mod collector;
/// Data errors.
pub mod error;
/// External feeds.
pub mod providers;
/// History files.
pub mod repositories;

pub use error::{DataError, Result};
