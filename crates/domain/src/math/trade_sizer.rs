use crate::error::{DomainError, Result};
use crate::value_objects::{TradePlan, TradeSide};

/// Sizes the single-sided trade that moves the wallet to the target split.
///
/// `price` is quote units per base unit. The whole wallet is valued in quote,
/// `proportion` of it is wanted as base (the part of the range above price),
/// and that value is converted back to base units by dividing by `price`.
/// The resulting amount is expressed in units of the asset being sold.
pub fn size_trade(
    quote_balance: f64,
    base_balance: f64,
    price: f64,
    proportion: f64,
) -> Result<TradePlan> {
    if !(price.is_finite() && price > 0.0) {
        return Err(DomainError::InvalidPrice(price));
    }
    if !(0.0..=1.0).contains(&proportion) {
        return Err(DomainError::config(
            "proportion",
            format!("must be within [0, 1], got {proportion}"),
        ));
    }

    let total_quote = base_balance * price + quote_balance;
    let desired_base = total_quote * proportion / price;
    let delta = desired_base - base_balance;

    Ok(if delta < 0.0 {
        TradePlan {
            side: TradeSide::SellBase,
            amount: -delta,
        }
    } else {
        TradePlan {
            side: TradeSide::SellQuote,
            amount: delta * price,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sells_base_when_overweight() {
        // 10 base at 2 quote = 20, plus 0 quote; want half -> 5 base
        let plan = size_trade(0.0, 10.0, 2.0, 0.5).unwrap();
        assert_eq!(plan.side, TradeSide::SellBase);
        assert!((plan.amount - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_sells_quote_when_underweight() {
        // 20 quote, no base, price 4; want 25% -> 5 quote of value = 1.25 base
        let plan = size_trade(20.0, 0.0, 4.0, 0.25).unwrap();
        assert_eq!(plan.side, TradeSide::SellQuote);
        assert!((plan.amount - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_balanced_wallet_needs_no_trade() {
        let plan = size_trade(10.0, 5.0, 2.0, 0.5).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_amount_is_never_negative() {
        for (quote, base, price, proportion) in [
            (0.0, 0.0, 1.0, 0.5),
            (1.0, 1000.0, 0.0003, 0.2),
            (3.5, 12.0, 0.0004, 0.8),
            (100.0, 0.0, 2500.0, 0.33),
        ] {
            let plan = size_trade(quote, base, price, proportion).unwrap();
            assert!(plan.amount >= 0.0);
            let sells_base = proportion * (base * price + quote) < base * price;
            assert_eq!(plan.side == TradeSide::SellBase, sells_base);
        }
    }

    #[test]
    fn test_rejects_bad_inputs() {
        assert!(matches!(
            size_trade(1.0, 1.0, 0.0, 0.5),
            Err(DomainError::InvalidPrice(_))
        ));
        assert!(size_trade(1.0, 1.0, 1.0, 1.5).is_err());
    }
}
