pub mod position;
pub mod samples;
pub mod signal;

// Re-export for easier access
pub use position::{PositionState, TokenId};
pub use samples::{AprSample, PriceSample};
pub use signal::{SignalSnapshot, SmoothedSignal};
