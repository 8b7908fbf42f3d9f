//! TokenSniffer risk scoring.
//!
//! Fails closed: transport errors, non-200 responses and unreadable bodies
//! all score 0.

use std::time::Duration;

use alloy::primitives::Address;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;

use crate::domain::clamp_score;
use crate::ports::RiskScorer;

#[derive(Debug, Error)]
pub enum TokenSnifferError {
    #[error("Failed to create HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct TokenSnifferConfig {
    /// e.g. `https://tokensniffer.com/api/tokens`
    pub api_url: String,
    pub chain: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for TokenSnifferConfig {
    fn default() -> Self {
        Self {
            api_url: "https://tokensniffer.com/api/tokens".to_string(),
            chain: "base".to_string(),
            api_key: None,
            timeout: Duration::from_secs(15),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ScoreResponse {
    #[serde(default)]
    score: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct TokenSnifferClient {
    config: TokenSnifferConfig,
    http: Client,
}

impl TokenSnifferClient {
    pub fn new(config: TokenSnifferConfig) -> Result<Self, TokenSnifferError> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, http })
    }

    pub fn score_url(&self, token_address: Address) -> String {
        format!(
            "{}/{}/{:#x}",
            self.config.api_url.trim_end_matches('/'),
            self.config.chain,
            token_address
        )
    }
}

/// Only a plain 200 carries a score; any other status, 2xx included, scores 0
pub fn is_scored_status(status: StatusCode) -> bool {
    status == StatusCode::OK
}

/// Score from a 200 body; a missing or malformed score is 0
pub fn score_from_body(body: &str) -> u8 {
    serde_json::from_str::<ScoreResponse>(body)
        .ok()
        .and_then(|r| r.score)
        .map_or(0, clamp_score)
}

#[async_trait]
impl RiskScorer for TokenSnifferClient {
    async fn get_score(&self, token_address: Address) -> u8 {
        let mut request = self.http.get(self.score_url(token_address));
        if let Some(ref key) = self.config.api_key {
            request = request.query(&[("apikey", key)]);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(token = %token_address, error = %e, "Score request failed, scoring 0");
                return 0;
            }
        };

        if !is_scored_status(response.status()) {
            tracing::warn!(
                token = %token_address,
                status = response.status().as_u16(),
                "Score service returned non-200, scoring 0"
            );
            return 0;
        }

        match response.text().await {
            Ok(body) => score_from_body(&body),
            Err(e) => {
                tracing::warn!(token = %token_address, error = %e, "Unreadable score body, scoring 0");
                0
            }
        }
    }
}
