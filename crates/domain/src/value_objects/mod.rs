pub mod range_proposal;
pub mod trade_plan;

pub use range_proposal::RangeProposal;
pub use trade_plan::{TradePlan, TradeSide};
