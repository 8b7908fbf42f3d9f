use std::fmt;

use thiserror::Error;

use crate::domain::PositionError;
use crate::ports::{ChainError, MarketDataError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeDirection {
    Buy,
    Sell,
}

impl fmt::Display for TradeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TradeDirection::Buy => "buy",
            TradeDirection::Sell => "sell",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeStep {
    Approve,
    Swap,
}

impl fmt::Display for TradeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TradeStep::Approve => "approve",
            TradeStep::Swap => "swap",
        })
    }
}

/// Failures of a trade lifecycle.
///
/// `Connectivity` is fatal at startup; everything else is contained to the
/// candidate it happened on.
#[derive(Debug, Error)]
pub enum TradeError {
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    #[error("Signing key error: {0}")]
    Signing(String),

    #[error("{direction} {step} transaction failed: {reason}")]
    Transaction {
        direction: TradeDirection,
        step: TradeStep,
        reason: String,
    },

    #[error("Connectivity error: {0}")]
    Connectivity(String),

    #[error("Position error: {0}")]
    Position(#[from] PositionError),
}

impl From<MarketDataError> for TradeError {
    fn from(err: MarketDataError) -> Self {
        TradeError::DataUnavailable(err.to_string())
    }
}

/// Chain reads outside a transaction step
impl From<ChainError> for TradeError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::Connectivity(msg) => TradeError::Connectivity(msg),
            ChainError::Signing(msg) => TradeError::Signing(msg),
            other => TradeError::DataUnavailable(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_error_names_step() {
        let err = TradeError::Transaction {
            direction: TradeDirection::Sell,
            step: TradeStep::Approve,
            reason: "nonce too low".into(),
        };
        assert_eq!(err.to_string(), "sell approve transaction failed: nonce too low");
    }

    #[test]
    fn test_chain_error_mapping() {
        assert!(matches!(
            TradeError::from(ChainError::Connectivity("down".into())),
            TradeError::Connectivity(_)
        ));
        assert!(matches!(
            TradeError::from(ChainError::Rpc("timeout".into())),
            TradeError::DataUnavailable(_)
        ));
    }

    #[test]
    fn test_signing_error_comes_from_chain_signer() {
        let err = TradeError::from(ChainError::Signing("key rejected".into()));
        assert!(matches!(err, TradeError::Signing(ref msg) if msg == "key rejected"));
    }

    #[test]
    fn test_market_data_is_unavailable() {
        let err: TradeError = MarketDataError::NoPriceData("0xabc".into()).into();
        assert!(matches!(err, TradeError::DataUnavailable(_)));
    }
}
