//! DexScreener Adapter
//!
//! Implements `MarketDataSource` on top of two DexScreener surfaces:
//! - the new-pairs HTML page for discovery (`discovery`)
//! - the public pairs JSON API for prices (`price`)

mod discovery;
mod price;

pub use discovery::{parse_listing, ListingQuery};
pub use price::{parse_price, price_url};

use std::time::Duration;

use alloy::primitives::Address;
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;

use crate::domain::DiscoveredPair;
use crate::ports::{MarketDataError, MarketDataSource};

const USER_AGENT: &str = concat!("base-sniper/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct DexScreenerConfig {
    /// New-pairs page, e.g. `https://dexscreener.com/new-pairs`
    pub listing_url: String,
    /// Pairs API root, e.g. `https://api.dexscreener.com`
    pub price_api_url: String,
    pub query: ListingQuery,
    /// Hosts that count as a social link on a pair card
    pub social_domains: Vec<String>,
    pub timeout: Duration,
}

impl Default for DexScreenerConfig {
    fn default() -> Self {
        Self {
            listing_url: "https://dexscreener.com/new-pairs".to_string(),
            price_api_url: "https://api.dexscreener.com".to_string(),
            query: ListingQuery {
                chain: "base".to_string(),
                min_liquidity: 5_000,
                max_liquidity: 120_000,
                max_age_hours: 24,
                rank_by: "trendingScoreH24".to_string(),
                order: "desc".to_string(),
            },
            social_domains: vec![
                "twitter.com".to_string(),
                "x.com".to_string(),
                "medium.com".to_string(),
            ],
            timeout: Duration::from_secs(15),
        }
    }
}

/// DexScreener-backed market data
#[derive(Debug, Clone)]
pub struct DexScreenerClient {
    config: DexScreenerConfig,
    http: Client,
}

impl DexScreenerClient {
    pub fn new(config: DexScreenerConfig) -> Result<Self, MarketDataError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| MarketDataError::RequestFailed(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, http })
    }

    async fn fetch_text(&self, request: reqwest::RequestBuilder) -> Result<String, MarketDataError> {
        let response = request
            .send()
            .await
            .map_err(|e| MarketDataError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MarketDataError::BadStatus {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| MarketDataError::RequestFailed(e.to_string()))
    }
}

#[async_trait]
impl MarketDataSource for DexScreenerClient {
    async fn discover_candidates(&self) -> Result<Vec<DiscoveredPair>, MarketDataError> {
        let request = self
            .http
            .get(&self.config.listing_url)
            .query(&self.config.query.params());
        let html = self.fetch_text(request).await?;

        let pairs = parse_listing(&html, &self.config.social_domains)?;
        tracing::debug!(count = pairs.len(), "Parsed new-pairs listing");
        Ok(pairs)
    }

    async fn get_price(&self, pair_address: Address) -> Result<Decimal, MarketDataError> {
        let url = price_url(&self.config.price_api_url, &self.config.query.chain, pair_address);
        let body = self.fetch_text(self.http.get(&url)).await?;
        parse_price(&body, pair_address)
    }
}
