use alloy::primitives::Address;
use async_trait::async_trait;

/// Trust score provider for token contracts
#[async_trait]
pub trait RiskScorer: Send + Sync {
    /// Score in 0..=100. Implementations fail closed: any error or
    /// non-success response is reported as 0 rather than raised.
    async fn get_score(&self, token_address: Address) -> u8;
}
