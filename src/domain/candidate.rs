use alloy::primitives::Address;
use serde::Serialize;

/// Only tokens with a perfect TokenSniffer score are traded
pub const REQUIRED_SCORE: u8 = 100;

/// Highest score the scoring service can report
pub const MAX_SCORE: u8 = 100;

/// A pair surfaced by discovery, before scoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DiscoveredPair {
    pub token_address: Address,
    pub pair_address: Address,
}

/// A scored pair awaiting the buy decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub token_address: Address,
    pub pair_address: Address,
    pub score: u8,
}

impl Candidate {
    pub fn new(pair: DiscoveredPair, score: u8) -> Self {
        Self {
            token_address: pair.token_address,
            pair_address: pair.pair_address,
            score: score.min(MAX_SCORE),
        }
    }

    /// Exact match, not a threshold: a 99 is rejected.
    pub fn is_accepted(&self) -> bool {
        self.score == REQUIRED_SCORE
    }
}

/// Clamp a raw score reported by the service into 0..=100.
///
/// NaN and negative values collapse to 0 so that garbage fails closed.
pub fn clamp_score(raw: f64) -> u8 {
    if raw.is_nan() || raw <= 0.0 {
        return 0;
    }
    raw.min(MAX_SCORE as f64).floor() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    fn pair() -> DiscoveredPair {
        DiscoveredPair {
            token_address: address!("1111111111111111111111111111111111111111"),
            pair_address: address!("2222222222222222222222222222222222222222"),
        }
    }

    #[test]
    fn test_only_perfect_score_accepted() {
        assert!(Candidate::new(pair(), 100).is_accepted());
        assert!(!Candidate::new(pair(), 99).is_accepted());
        assert!(!Candidate::new(pair(), 0).is_accepted());
    }

    #[test]
    fn test_candidate_score_capped() {
        let candidate = Candidate::new(pair(), 250);
        assert_eq!(candidate.score, 100);
    }

    #[test]
    fn test_clamp_score() {
        assert_eq!(clamp_score(100.0), 100);
        assert_eq!(clamp_score(99.9), 99);
        assert_eq!(clamp_score(140.0), 100);
        assert_eq!(clamp_score(-3.0), 0);
        assert_eq!(clamp_score(f64::NAN), 0);
        assert_eq!(clamp_score(f64::INFINITY), 100);
    }
}
