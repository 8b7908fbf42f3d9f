//! Integer basis-point math for position sizing and slippage bounds.
//!
//! Wei amounts never pass through floating point: fractions from config are
//! converted once into basis points and applied to `U256` values.

use alloy::primitives::U256;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;

pub const BPS_DENOMINATOR: u64 = 10_000;

#[derive(Debug, Error, PartialEq)]
pub enum SizingError {
    #[error("Fraction must be within 0..=1, got {0}")]
    OutOfRange(Decimal),
}

/// A fraction expressed in basis points (1 bps = 0.01%)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct BasisPoints(u64);

impl BasisPoints {
    pub const ZERO: Self = Self(0);
    pub const FULL: Self = Self(BPS_DENOMINATOR);

    /// Convert a 0..=1 fraction, truncating anything finer than 1 bps.
    pub fn from_fraction(fraction: Decimal) -> Result<Self, SizingError> {
        if fraction.is_sign_negative() || fraction > Decimal::ONE {
            return Err(SizingError::OutOfRange(fraction));
        }
        let bps = (fraction * Decimal::from(BPS_DENOMINATOR))
            .trunc()
            .to_u64()
            .ok_or(SizingError::OutOfRange(fraction))?;
        Ok(Self(bps))
    }

    pub fn value(self) -> u64 {
        self.0
    }

    /// `1 - self`
    pub fn complement(self) -> Self {
        Self(BPS_DENOMINATOR - self.0)
    }

    /// `amount * self / 10_000`, rounded down. Never exceeds `amount`.
    pub fn apply(self, amount: U256) -> U256 {
        let bps = U256::from(self.0);
        let denominator = U256::from(BPS_DENOMINATOR);
        match amount.checked_mul(bps) {
            Some(scaled) => scaled / denominator,
            None => amount / denominator * bps,
        }
    }
}

/// Native amount to spend on one candidate: a fixed share of the wallet balance
pub fn purchase_amount(balance: U256, fraction: BasisPoints) -> U256 {
    fraction.apply(balance)
}

/// Lowest acceptable swap output given a router quote and slippage tolerance
pub fn min_output(quoted: U256, slippage: BasisPoints) -> U256 {
    slippage.complement().apply(quoted)
}
