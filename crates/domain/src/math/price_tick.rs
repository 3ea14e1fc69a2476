use crate::config::RangeConfig;
use crate::error::{DomainError, Result};
use crate::value_objects::RangeProposal;
use primitive_types::U256;

/// 2^96, the fixed-point scale of `sqrtPriceX96`.
const Q96: f64 = 79_228_162_514_264_337_593_543_950_336.0;

/// Converts a U256 into the nearest f64.
pub fn u256_to_f64(value: U256) -> f64 {
    value
        .0
        .iter()
        .rev()
        .fold(0.0, |acc, limb| acc * 18_446_744_073_709_551_616.0 + *limb as f64)
}

/// Decodes a pool `sqrtPriceX96` slot into a plain price (token1 per token0).
pub fn decode_sqrt_price_x96(sqrt_price_x96: U256) -> f64 {
    let sqrt_price = u256_to_f64(sqrt_price_x96) / Q96;
    sqrt_price * sqrt_price
}

/// Rescales a raw pool price (smallest quote units per smallest base unit)
/// into whole quote tokens per whole base token.
pub fn adjust_for_decimals(raw_price: f64, base_decimals: u8, quote_decimals: u8) -> f64 {
    raw_price * 10f64.powi(i32::from(base_decimals) - i32::from(quote_decimals))
}

/// Price at a given tick: multiplier ^ tick.
pub fn tick_to_price(tick: i32, multiplier: f64) -> f64 {
    multiplier.powi(tick)
}

/// Smallest tick whose price is at or above `price`: ceil(log(price) / log(multiplier)).
pub fn price_to_tick_ceil(price: f64, multiplier: f64) -> Result<i32> {
    if !(price.is_finite() && price > 0.0) {
        return Err(DomainError::InvalidPrice(price));
    }
    let tick = (price.ln() / multiplier.ln()).ceil();
    if tick < f64::from(i32::MIN) || tick > f64::from(i32::MAX) {
        return Err(DomainError::InvalidPrice(price));
    }
    Ok(tick as i32)
}

/// Fraction of the range lying above `price`, clamped into the configured bounds.
pub fn proportion_above(lower: f64, upper: f64, price: f64, config: &RangeConfig) -> f64 {
    let proportion = (upper - price) / (upper - lower);
    proportion.clamp(config.min_proportion, config.max_proportion)
}

/// Derives the tick range and capital split for a decoded price.
pub fn find_range(price: f64, config: &RangeConfig) -> Result<RangeProposal> {
    config.validate()?;
    let multiplier = config.tick_multiplier;
    let tick = price_to_tick_ceil(price, multiplier)?;

    let grid = f64::from(config.grid_ticks);
    let snapped = ((f64::from(tick) / grid).ceil() * grid) as i32;
    let tick_upper = snapped.saturating_add(config.upper_offset_ticks);
    let tick_lower = tick_upper.saturating_sub(config.width_ticks);

    let upper_price_bound = tick_to_price(tick_upper, multiplier);
    let lower_price_bound = tick_to_price(tick_lower, multiplier);

    Ok(RangeProposal {
        tick_lower,
        tick_upper,
        lower_price_bound,
        upper_price_bound,
        proportion: proportion_above(lower_price_bound, upper_price_bound, price, config),
        reference_price: price,
    })
}

/// Derives the tick range straight from the pool's `sqrtPriceX96` slot.
pub fn find_range_from_sqrt_price(
    sqrt_price_x96: U256,
    config: &RangeConfig,
) -> Result<RangeProposal> {
    find_range(decode_sqrt_price_x96(sqrt_price_x96), config)
}
