use std::str::FromStr;

use alloy::primitives::Address;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::ports::MarketDataError;

/// `GET /latest/dex/pairs/{chain}/{pair}` body. Older responses carry a
/// single `pair`, newer ones a `pairs` array.
#[derive(Debug, Deserialize)]
struct PairsResponse {
    #[serde(default)]
    pair: Option<PairEntry>,
    #[serde(default)]
    pairs: Option<Vec<PairEntry>>,
}

#[derive(Debug, Deserialize)]
struct PairEntry {
    #[serde(rename = "pairAddress")]
    pair_address: String,
    #[serde(rename = "priceUsd")]
    price_usd: Option<String>,
}

pub fn price_url(base_url: &str, chain: &str, pair_address: Address) -> String {
    format!(
        "{}/latest/dex/pairs/{}/{:#x}",
        base_url.trim_end_matches('/'),
        chain,
        pair_address
    )
}

/// Pull the USD price of `pair_address` out of a pairs response
pub fn parse_price(body: &str, pair_address: Address) -> Result<Decimal, MarketDataError> {
    let response: PairsResponse =
        serde_json::from_str(body).map_err(|e| MarketDataError::ParseError(e.to_string()))?;

    let entry = response
        .pair
        .into_iter()
        .chain(response.pairs.unwrap_or_default())
        .find(|entry| {
            entry
                .pair_address
                .parse::<Address>()
                .is_ok_and(|address| address == pair_address)
        })
        .ok_or_else(|| MarketDataError::NoPriceData(format!("{pair_address:#x}")))?;

    let raw = entry
        .price_usd
        .ok_or_else(|| MarketDataError::NoPriceData(format!("{pair_address:#x}: priceUsd missing")))?;

    Decimal::from_str(raw.trim())
        .or_else(|_| Decimal::from_scientific(raw.trim()))
        .map_err(|e| MarketDataError::ParseError(format!("priceUsd '{raw}': {e}")))
}
