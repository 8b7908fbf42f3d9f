use alloy::primitives::Address;
use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::DiscoveredPair;

/// Market data error type
#[derive(Error, Debug)]
pub enum MarketDataError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Unexpected HTTP status {status} from {url}")]
    BadStatus { status: u16, url: String },

    #[error("Data parsing error: {0}")]
    ParseError(String),

    #[error("No price data for pair: {0}")]
    NoPriceData(String),
}

/// Source of new pairs and pair prices
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Snapshot of freshly listed pairs that passed the listing filters.
    /// No pagination: callers treat one call as the whole batch.
    async fn discover_candidates(&self) -> Result<Vec<DiscoveredPair>, MarketDataError>;

    /// Current USD price of the pair's base token
    async fn get_price(&self, pair_address: Address) -> Result<Decimal, MarketDataError>;
}
