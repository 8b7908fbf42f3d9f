//! New-pairs page scraping.
//!
//! The listing page renders one `div.pair-container` per pair with the token
//! and pair addresses in data attributes. A pair only counts when its card
//! links to one of the configured social domains.

use std::collections::HashSet;

use alloy::primitives::Address;
use reqwest::Url;
use scraper::{Html, Selector};

use crate::domain::DiscoveredPair;
use crate::ports::MarketDataError;

const PAIR_CONTAINER: &str = "div.pair-container";
const LINK: &str = "a[href]";
const TOKEN_ATTR: &str = "data-token-address";
const PAIR_ATTR: &str = "data-pair-address";

/// Server-side listing filters sent as query parameters
#[derive(Debug, Clone, PartialEq)]
pub struct ListingQuery {
    pub chain: String,
    pub min_liquidity: u64,
    pub max_liquidity: u64,
    pub max_age_hours: u32,
    pub rank_by: String,
    pub order: String,
}

impl ListingQuery {
    pub fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("rankBy", self.rank_by.clone()),
            ("order", self.order.clone()),
            ("chainIds", self.chain.clone()),
            ("minLiq", self.min_liquidity.to_string()),
            ("maxLiq", self.max_liquidity.to_string()),
            ("maxAge", self.max_age_hours.to_string()),
        ]
    }
}

/// Extract pairs that link to a social domain, deduplicated by token
pub fn parse_listing(
    html: &str,
    social_domains: &[String],
) -> Result<Vec<DiscoveredPair>, MarketDataError> {
    let container = selector(PAIR_CONTAINER)?;
    let link = selector(LINK)?;
    let document = Html::parse_document(html);

    let mut seen = HashSet::new();
    let mut pairs = Vec::new();

    for card in document.select(&container) {
        let has_social = card
            .select(&link)
            .filter_map(|a| a.value().attr("href"))
            .any(|href| is_social_link(href, social_domains));
        if !has_social {
            continue;
        }

        let attrs = card.value();
        let (Some(token), Some(pair)) = (attrs.attr(TOKEN_ATTR), attrs.attr(PAIR_ATTR)) else {
            tracing::debug!("Skipping pair card without address attributes");
            continue;
        };
        let (Ok(token_address), Ok(pair_address)) =
            (token.trim().parse::<Address>(), pair.trim().parse::<Address>())
        else {
            tracing::debug!(token, pair, "Skipping pair card with malformed address");
            continue;
        };

        if seen.insert(token_address) {
            pairs.push(DiscoveredPair {
                token_address,
                pair_address,
            });
        }
    }

    Ok(pairs)
}

/// Host must be the domain itself or one of its subdomains
fn is_social_link(href: &str, social_domains: &[String]) -> bool {
    let Ok(url) = Url::parse(href.trim()) else {
        return false;
    };
    let Some(host) = url.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();

    social_domains.iter().any(|domain| {
        let domain = domain.trim().to_ascii_lowercase();
        !domain.is_empty() && (host == domain || host.ends_with(&format!(".{domain}")))
    })
}

fn selector(css: &str) -> Result<Selector, MarketDataError> {
    Selector::parse(css).map_err(|e| MarketDataError::ParseError(format!("selector '{css}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    fn domains() -> Vec<String> {
        vec!["twitter.com".into(), "x.com".into(), "medium.com".into()]
    }

    const LISTING: &str = r#"
<html><body>
  <div class="pair-container"
       data-token-address="0x1111111111111111111111111111111111111111"
       data-pair-address="0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa">
    <a href="https://twitter.com/realtoken">Twitter</a>
  </div>
  <div class="pair-container"
       data-token-address="0x2222222222222222222222222222222222222222"
       data-pair-address="0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb">
    <a href="https://t.me/nosocial">Telegram</a>
  </div>
  <div class="pair-container"
       data-token-address="0x3333333333333333333333333333333333333333"
       data-pair-address="0xcccccccccccccccccccccccccccccccccccccccc">
    <a href="https://X.com/upper">X</a>
  </div>
  <div class="pair-container" data-token-address="garbage" data-pair-address="0xdd">
    <a href="https://medium.com/@x">Blog</a>
  </div>
  <div class="pair-container"
       data-token-address="0x1111111111111111111111111111111111111111"
       data-pair-address="0xeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee">
    <a href="https://medium.com/dupe">Duplicate token</a>
  </div>
  <div class="pair-container"
       data-token-address="0x4444444444444444444444444444444444444444"
       data-pair-address="0xffffffffffffffffffffffffffffffffffffffff">
    <a href="https://pepex.com">Website</a>
  </div>
  <div class="pair-container"
       data-token-address="0x5555555555555555555555555555555555555555"
       data-pair-address="0x9999999999999999999999999999999999999999">
    <a href="https://scam.io/?ref=twitter.com">Website</a>
    <a href="/twitter.com/relative">Relative</a>
  </div>
  <div class="pair-container"
       data-token-address="0x6666666666666666666666666666666666666666"
       data-pair-address="0x8888888888888888888888888888888888888888">
    <a href="https://mobile.twitter.com/subdomain">Twitter</a>
  </div>
</body></html>
"#;

    #[test]
    fn test_parse_listing_keeps_social_pairs() {
        let pairs = parse_listing(LISTING, &domains()).unwrap();
        assert_eq!(
            pairs,
            vec![
                DiscoveredPair {
                    token_address: address!("1111111111111111111111111111111111111111"),
                    pair_address: address!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"),
                },
                DiscoveredPair {
                    token_address: address!("3333333333333333333333333333333333333333"),
                    pair_address: address!("cccccccccccccccccccccccccccccccccccccccc"),
                },
                DiscoveredPair {
                    token_address: address!("6666666666666666666666666666666666666666"),
                    pair_address: address!("8888888888888888888888888888888888888888"),
                },
            ]
        );
    }

    #[test]
    fn test_social_link_matches_host_only() {
        let domains = domains();
        assert!(is_social_link("https://twitter.com/realtoken", &domains));
        assert!(is_social_link("https://mobile.twitter.com/realtoken", &domains));
        assert!(is_social_link("https://X.COM/upper", &domains));
        assert!(!is_social_link("https://pepex.com", &domains));
        assert!(!is_social_link("https://scam.io/?ref=twitter.com", &domains));
        assert!(!is_social_link("https://twitter.com.evil.io/path", &domains));
        assert!(!is_social_link("/twitter.com/relative", &domains));
    }

    #[test]
    fn test_parse_empty_page() {
        let pairs = parse_listing("<html><body></body></html>", &domains()).unwrap();
        assert!(pairs.is_empty());
    }

    #[test]
    fn test_no_domains_means_no_pairs() {
        assert!(parse_listing(LISTING, &[]).unwrap().is_empty());
    }

    #[test]
    fn test_listing_params() {
        let query = ListingQuery {
            chain: "base".into(),
            min_liquidity: 5_000,
            max_liquidity: 120_000,
            max_age_hours: 24,
            rank_by: "trendingScoreH24".into(),
            order: "desc".into(),
        };
        let params = query.params();
        assert!(params.contains(&("chainIds", "base".to_string())));
        assert!(params.contains(&("minLiq", "5000".to_string())));
        assert!(params.contains(&("maxLiq", "120000".to_string())));
        assert!(params.contains(&("maxAge", "24".to_string())));
    }
}
