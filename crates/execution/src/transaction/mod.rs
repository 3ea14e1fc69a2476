//! Transaction bookkeeping around collaborator calls.
//!
//! - Pending-transaction tracking released on every exit path
//! - Bounded retry with exponential backoff for transient failures

mod pending;
mod retry;

pub use pending::*;
pub use retry::*;
