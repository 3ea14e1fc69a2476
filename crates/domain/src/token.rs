use primitive_types::U256;
use rust_decimal::Decimal;
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An ERC-20 token taking part in the managed pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    pub address: String,
    pub symbol: String,
    pub decimals: u8,
}

impl Token {
    pub fn new(address: impl Into<String>, symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            address: address.into(),
            symbol: symbol.into(),
            decimals,
        }
    }

    /// Wraps a raw on-chain amount of this token.
    pub fn amount(&self, raw: U256) -> Amount {
        Amount::new(raw, self.decimals)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

/// A raw token amount together with the decimals needed to read it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Amount {
    pub raw: U256,
    pub decimals: u8,
}

impl Amount {
    pub fn new(raw: U256, decimals: u8) -> Self {
        Self { raw, decimals }
    }

    pub fn zero(decimals: u8) -> Self {
        Self::new(U256::zero(), decimals)
    }

    /// Converts a human-readable amount into raw units, truncating extra precision.
    pub fn from_decimal(d: Decimal, decimals: u8) -> Self {
        if d <= Decimal::ZERO {
            return Self::zero(decimals);
        }
        let raw = (0..decimals)
            .try_fold(d, |acc, _| acc.checked_mul(Decimal::TEN))
            .and_then(|scaled| scaled.trunc().to_u128())
            .unwrap_or(0);
        Self {
            raw: U256::from(raw),
            decimals,
        }
    }

    /// Converts a float, rounded to `places` decimal places first.
    pub fn from_f64_rounded(value: f64, decimals: u8, places: u32) -> Self {
        Decimal::from_f64(value)
            .map(|d| Self::from_decimal(d.round_dp(places), decimals))
            .unwrap_or_else(|| Self::zero(decimals))
    }

    /// Human-readable value. Saturates at `Decimal::MAX` for amounts that do not fit.
    pub fn to_decimal(&self) -> Decimal {
        if self.raw.bits() > 96 {
            return Decimal::MAX;
        }
        Decimal::try_from_i128_with_scale(self.raw.low_u128() as i128, u32::from(self.decimals))
            .unwrap_or(Decimal::MAX)
    }

    pub fn to_f64(&self) -> f64 {
        self.to_decimal().to_f64().unwrap_or(f64::MAX)
    }

    /// Returns `raw * numerator / denominator`, e.g. `scaled(999, 1000)` keeps 99.9%.
    pub fn scaled(&self, numerator: u64, denominator: u64) -> Self {
        if denominator == 0 {
            return Self::zero(self.decimals);
        }
        let raw = self.raw.saturating_mul(U256::from(numerator)) / U256::from(denominator);
        Self::new(raw, self.decimals)
    }

    pub fn is_zero(&self) -> bool {
        self.raw.is_zero()
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}
