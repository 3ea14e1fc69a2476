//! Live execution for the range keeper.
//!
//! This crate provides:
//! - The position lifecycle controller and the gated decision cycle
//! - Position-id cache and swap cooldown bookkeeping
//! - Lifecycle event tracking
//! - Pending-transaction guards and bounded retry
//! - A scheduler running each cycle single-flight

/// Prelude module for convenient imports.
pub mod prelude;

/// Position-id cache.
pub mod cache;
/// Execution errors.
pub mod error;
/// Position lifecycle tracking.
pub mod lifecycle;
/// Scheduler for cycle timing.
pub mod scheduler;
/// Keeper service wiring cycles to the scheduler.
pub mod service;
/// Strategy execution.
pub mod strategy;
/// Transaction bookkeeping and retry.
pub mod transaction;

pub use error::{ExecutionError, Result};
