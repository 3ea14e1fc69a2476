//! Strategy execution.
//!
//! The decision cycle gates the controller on the latest signal; the
//! controller owns the position lifecycle.

mod controller;
mod cycle;

pub use controller::*;
pub use cycle::*;
