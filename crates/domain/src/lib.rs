//! Pure core of the range keeper.
//!
//! Everything here is synchronous and side-effect free:
//! - Time-series samples and smoothed signals
//! - EWMA smoothing and the volatility estimator
//! - Range finding from a pool price and trade sizing
//! - The condition gate and cooldown bookkeeping
//! - Strategy configuration with validated defaults

/// Strategy configuration.
pub mod config;
/// Inter-trade cooldown.
pub mod cooldown;
/// Samples, signals and position state.
pub mod entities;
/// Domain errors.
pub mod error;
/// Condition gate.
pub mod gate;
/// Signal and range mathematics.
pub mod math;
/// Tokens and raw amounts.
pub mod token;
/// Range proposals and trade plans.
pub mod value_objects;

pub use error::{DomainError, Result};
