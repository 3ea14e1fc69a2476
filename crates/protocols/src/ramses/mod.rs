//! Ramses concentrated-liquidity adapter.
//!
//! This module talks to the deployed contracts over JSON-RPC:
//! - Read the pool price slot
//! - Enumerate and read the owned position
//! - Mint, and exit through a single multicall batch
//! - Read wallet balances and submit aggregator swaps

/// Calldata assembly for the position manager.
pub mod calls;
/// JSON-RPC client implementing the collaborator traits.
pub mod client;
/// Contract bindings.
pub mod contracts;
/// Integer conversions between the on-chain and domain representations.
pub mod convert;

pub use calls::ManagerCalls;
pub use client::RamsesClient;
