//! Prelude module for convenient imports.
//!
//! # Example
//!
//! ```rust
//! use clmm_keeper_execution::prelude::*;
//! ```

// Cache
pub use crate::cache::PositionCache;

// Errors
pub use crate::error::{ExecutionError, Result};

// Lifecycle
pub use crate::lifecycle::{
    AggregateStats, DeferredData, EventData, ExitedData, LifecycleEvent, LifecycleEventType,
    LifecycleTracker, MintedData, PositionSummary, SkippedData, TradeData,
};

// Scheduler
pub use crate::scheduler::{
    Schedule, ScheduleBuilder, ScheduledTask, Scheduler, SingleFlight, TaskEvent,
};

// Service
pub use crate::service::{KeeperService, ScheduleConfig};

// Strategy
pub use crate::strategy::{
    Assessment, Collaborators, ControllerConfig, ControllerState, CycleOutcome, CycleReport,
    DecisionCycle, PlannedAction, PositionController,
};

// Transaction
pub use crate::transaction::{PendingGuard, PendingTransaction, PendingTransactions, RetryPolicy};
