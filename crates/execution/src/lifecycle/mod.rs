//! Position lifecycle tracking.
//!
//! Records what the controller did to the wallet and the position:
//! - Rebalancing trades
//! - Mints and exits
//! - Deferred and skipped entries

mod events;
mod tracker;

pub use events::*;
pub use tracker::*;
