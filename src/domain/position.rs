use std::fmt;
use std::time::Duration;

use alloy::primitives::{Address, U256};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::candidate::Candidate;

#[derive(Debug, Error)]
pub enum PositionError {
    #[error("Invalid entry price: {0}")]
    InvalidEntryPrice(Decimal),
    #[error("Profit multiplier must be > 1, got {0}")]
    InvalidMultiplier(Decimal),
    #[error("Purchase amount is zero")]
    ZeroAmount,
}

/// How much of the token is sold on exit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SellSizing {
    /// Sell the same raw amount that was spent on the buy
    #[default]
    PurchaseAmount,
    /// Sell the wallet's full token balance
    TokenBalance,
}

/// An open trade, owned by the monitoring loop until it is sold
#[derive(Debug, Clone, Serialize)]
pub struct Position {
    pub token_address: Address,
    pub pair_address: Address,
    /// Native currency spent, in wei
    pub purchase_amount: U256,
    pub initial_price: Decimal,
    pub target_price: Decimal,
    pub opened_at: DateTime<Utc>,
}

impl Position {
    pub fn open(
        candidate: &Candidate,
        purchase_amount: U256,
        initial_price: Decimal,
        profit_multiplier: Decimal,
    ) -> Result<Self, PositionError> {
        if purchase_amount.is_zero() {
            return Err(PositionError::ZeroAmount);
        }
        if initial_price <= Decimal::ZERO {
            return Err(PositionError::InvalidEntryPrice(initial_price));
        }

        Ok(Self {
            token_address: candidate.token_address,
            pair_address: candidate.pair_address,
            purchase_amount,
            initial_price,
            target_price: target_price(initial_price, profit_multiplier)?,
            opened_at: Utc::now(),
        })
    }

    pub fn is_target_reached(&self, price: Decimal) -> bool {
        price >= self.target_price
    }

    pub fn pnl_pct(&self, price: Decimal) -> Decimal {
        (price - self.initial_price) / self.initial_price * Decimal::ONE_HUNDRED
    }
}

pub fn target_price(initial_price: Decimal, profit_multiplier: Decimal) -> Result<Decimal, PositionError> {
    if profit_multiplier <= Decimal::ONE {
        return Err(PositionError::InvalidMultiplier(profit_multiplier));
    }
    Ok(initial_price * profit_multiplier)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitReason {
    TargetReached,
    StopLoss,
    Timeout,
    Stopped,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ExitReason::TargetReached => "target reached",
            ExitReason::StopLoss => "stop loss",
            ExitReason::Timeout => "timeout",
            ExitReason::Stopped => "stopped",
        };
        f.write_str(label)
    }
}

/// Exit rules applied to every price reading of a position.
///
/// With no stop loss and no max duration the only way out is the target.
#[derive(Debug, Clone, PartialEq)]
pub struct ExitPolicy {
    pub target_price: Decimal,
    pub stop_loss_price: Option<Decimal>,
    pub max_duration: Option<Duration>,
}

impl ExitPolicy {
    pub fn for_position(
        position: &Position,
        stop_loss_fraction: Option<Decimal>,
        max_duration: Option<Duration>,
    ) -> Self {
        Self {
            target_price: position.target_price,
            stop_loss_price: stop_loss_fraction
                .map(|fraction| position.initial_price * (Decimal::ONE - fraction)),
            max_duration,
        }
    }

    pub fn evaluate(&self, price: Decimal, elapsed: Duration) -> Option<ExitReason> {
        if price >= self.target_price {
            return Some(ExitReason::TargetReached);
        }
        if matches!(self.stop_loss_price, Some(stop) if price <= stop) {
            return Some(ExitReason::StopLoss);
        }
        if self.is_expired(elapsed) {
            return Some(ExitReason::Timeout);
        }
        None
    }

    pub fn is_expired(&self, elapsed: Duration) -> bool {
        matches!(self.max_duration, Some(limit) if elapsed >= limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::candidate::DiscoveredPair;
    use alloy::primitives::address;
    use rust_decimal_macros::dec;

    fn candidate() -> Candidate {
        Candidate::new(
            DiscoveredPair {
                token_address: address!("1111111111111111111111111111111111111111"),
                pair_address: address!("2222222222222222222222222222222222222222"),
            },
            100,
        )
    }

    #[test]
    fn test_open_position_sets_target() {
        let position = Position::open(&candidate(), U256::from(100_000u64), dec!(1.00), dec!(1.5)).unwrap();
        assert_eq!(position.target_price, dec!(1.50));
        assert_eq!(position.initial_price, dec!(1.00));
        assert_eq!(position.purchase_amount, U256::from(100_000u64));
    }

    #[test]
    fn test_target_price_exact() {
        assert_eq!(target_price(dec!(0.000123), dec!(1.5)).unwrap(), dec!(0.0001845));
        assert!(matches!(
            target_price(dec!(1), dec!(1)),
            Err(PositionError::InvalidMultiplier(_))
        ));
    }

    #[test]
    fn test_open_rejects_bad_inputs() {
        assert!(matches!(
            Position::open(&candidate(), U256::ZERO, dec!(1), dec!(1.5)),
            Err(PositionError::ZeroAmount)
        ));
        assert!(matches!(
            Position::open(&candidate(), U256::from(1u64), dec!(0), dec!(1.5)),
            Err(PositionError::InvalidEntryPrice(_))
        ));
    }

    #[test]
    fn test_target_reached_boundary() {
        let position = Position::open(&candidate(), U256::from(1u64), dec!(1.0), dec!(1.5)).unwrap();
        assert!(!position.is_target_reached(dec!(1.4999)));
        assert!(position.is_target_reached(dec!(1.5)));
        assert!(position.is_target_reached(dec!(2.0)));
    }

    #[test]
    fn test_pnl_pct() {
        let position = Position::open(&candidate(), U256::from(1u64), dec!(2.0), dec!(1.5)).unwrap();
        assert_eq!(position.pnl_pct(dec!(3.0)), dec!(50));
        assert_eq!(position.pnl_pct(dec!(1.0)), dec!(-50));
    }

    #[test]
    fn test_unbounded_policy_only_exits_on_target() {
        let position = Position::open(&candidate(), U256::from(1u64), dec!(1.0), dec!(1.5)).unwrap();
        let policy = ExitPolicy::for_position(&position, None, None);

        assert_eq!(policy.evaluate(dec!(0.01), Duration::from_secs(86_400 * 30)), None);
        assert_eq!(policy.evaluate(dec!(1.49), Duration::ZERO), None);
        assert_eq!(
            policy.evaluate(dec!(1.5), Duration::ZERO),
            Some(ExitReason::TargetReached)
        );
    }

    #[test]
    fn test_stop_loss_and_timeout() {
        let position = Position::open(&candidate(), U256::from(1u64), dec!(1.0), dec!(1.5)).unwrap();
        let policy = ExitPolicy::for_position(
            &position,
            Some(dec!(0.3)),
            Some(Duration::from_secs(600)),
        );

        assert_eq!(policy.stop_loss_price, Some(dec!(0.7)));
        assert_eq!(policy.evaluate(dec!(0.7), Duration::ZERO), Some(ExitReason::StopLoss));
        assert_eq!(policy.evaluate(dec!(0.8), Duration::from_secs(599)), None);
        assert_eq!(
            policy.evaluate(dec!(0.8), Duration::from_secs(600)),
            Some(ExitReason::Timeout)
        );
        // Target wins over a simultaneous timeout
        assert_eq!(
            policy.evaluate(dec!(1.6), Duration::from_secs(601)),
            Some(ExitReason::TargetReached)
        );
    }
}
