//! Signal and range mathematics.

/// Exponentially-weighted moving average.
pub mod ewma;
/// Tick and fixed-point price conversions, range finding.
pub mod price_tick;
/// Rebalancing trade sizing.
pub mod trade_sizer;
/// Realized-volatility proxy.
pub mod volatility;

pub use ewma::{ewma, smooth_window};
pub use price_tick::{
    adjust_for_decimals, decode_sqrt_price_x96, find_range, find_range_from_sqrt_price,
};
pub use trade_sizer::size_trade;
pub use volatility::estimate_volatility;
