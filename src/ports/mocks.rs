//! Scripted in-memory ports that record calls and replay controlled responses.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use alloy::primitives::{keccak256, Address, Bytes, TxHash, U256};
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use rust_decimal::Decimal;

use super::chain::{CallSpec, ChainClient, ChainError, ReceiptStatus, SignedTransaction};
use super::market_data::{MarketDataError, MarketDataSource};
use super::risk::RiskScorer;
use crate::domain::DiscoveredPair;

/// Mock market data with a scripted price sequence per pair.
///
/// A `None` entry in a price script replays as a request failure; an
/// exhausted script reports `NoPriceData`.
#[derive(Debug, Default)]
pub struct MockMarketData {
    pairs: Arc<Mutex<Vec<DiscoveredPair>>>,
    discovery_error: Arc<Mutex<Option<String>>>,
    prices: Arc<Mutex<HashMap<Address, VecDeque<Option<Decimal>>>>>,
    price_calls: Arc<Mutex<Vec<Address>>>,
}

impl MockMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pair(self, pair: DiscoveredPair) -> Self {
        self.pairs.lock().unwrap().push(pair);
        self
    }

    pub fn with_prices(self, pair_address: Address, prices: &[Decimal]) -> Self {
        self.prices
            .lock()
            .unwrap()
            .entry(pair_address)
            .or_default()
            .extend(prices.iter().copied().map(Some));
        self
    }

    pub fn with_price_error(self, pair_address: Address) -> Self {
        self.prices
            .lock()
            .unwrap()
            .entry(pair_address)
            .or_default()
            .push_back(None);
        self
    }

    pub fn with_discovery_error(self, message: &str) -> Self {
        *self.discovery_error.lock().unwrap() = Some(message.to_string());
        self
    }

    /// Number of price reads made for a pair
    pub fn price_calls(&self, pair_address: Address) -> usize {
        self.price_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|p| **p == pair_address)
            .count()
    }

    /// Scripted prices not yet consumed
    pub fn remaining_prices(&self, pair_address: Address) -> usize {
        self.prices
            .lock()
            .unwrap()
            .get(&pair_address)
            .map_or(0, VecDeque::len)
    }
}

#[async_trait]
impl MarketDataSource for MockMarketData {
    async fn discover_candidates(&self) -> Result<Vec<DiscoveredPair>, MarketDataError> {
        if let Some(message) = self.discovery_error.lock().unwrap().clone() {
            return Err(MarketDataError::RequestFailed(message));
        }
        Ok(self.pairs.lock().unwrap().clone())
    }

    async fn get_price(&self, pair_address: Address) -> Result<Decimal, MarketDataError> {
        self.price_calls.lock().unwrap().push(pair_address);
        match self
            .prices
            .lock()
            .unwrap()
            .get_mut(&pair_address)
            .and_then(VecDeque::pop_front)
        {
            Some(Some(price)) => Ok(price),
            Some(None) => Err(MarketDataError::BadStatus {
                status: 500,
                url: format!("mock://pairs/{pair_address:#x}"),
            }),
            None => Err(MarketDataError::NoPriceData(format!("{pair_address:#x}"))),
        }
    }
}

/// Mock scorer; unknown tokens score 0
#[derive(Debug, Default)]
pub struct MockRiskScorer {
    scores: Arc<Mutex<HashMap<Address, u8>>>,
    calls: Arc<Mutex<Vec<Address>>>,
}

impl MockRiskScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_score(self, token_address: Address, score: u8) -> Self {
        self.scores.lock().unwrap().insert(token_address, score);
        self
    }

    pub fn get_calls(&self) -> Vec<Address> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RiskScorer for MockRiskScorer {
    async fn get_score(&self, token_address: Address) -> u8 {
        self.calls.lock().unwrap().push(token_address);
        self.scores
            .lock()
            .unwrap()
            .get(&token_address)
            .copied()
            .unwrap_or(0)
    }
}

/// Mock node.
///
/// The reported nonce stays fixed unless `with_nonce_tracking` is set, which
/// models a node that has not yet seen earlier submissions.
#[derive(Debug)]
pub struct MockChain {
    balance: Arc<Mutex<U256>>,
    token_balance: Arc<Mutex<U256>>,
    node_nonce: Arc<Mutex<u64>>,
    track_nonce: bool,
    quote: Arc<Mutex<Option<Vec<U256>>>>,
    receipt: Arc<Mutex<Option<ReceiptStatus>>>,
    reject_submission: Arc<Mutex<Option<usize>>>,
    fail_signing: bool,
    attempts: Arc<Mutex<usize>>,
    built: Arc<Mutex<Vec<CallSpec>>>,
    submitted: Arc<Mutex<Vec<TxHash>>>,
}

impl Default for MockChain {
    fn default() -> Self {
        Self {
            balance: Arc::new(Mutex::new(U256::ZERO)),
            token_balance: Arc::new(Mutex::new(U256::ZERO)),
            node_nonce: Arc::new(Mutex::new(0)),
            track_nonce: false,
            quote: Arc::new(Mutex::new(None)),
            receipt: Arc::new(Mutex::new(Some(ReceiptStatus::Success))),
            reject_submission: Arc::new(Mutex::new(None)),
            fail_signing: false,
            attempts: Arc::new(Mutex::new(0)),
            built: Arc::new(Mutex::new(Vec::new())),
            submitted: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_balance(self, balance: U256) -> Self {
        *self.balance.lock().unwrap() = balance;
        self
    }

    pub fn with_token_balance(self, balance: U256) -> Self {
        *self.token_balance.lock().unwrap() = balance;
        self
    }

    pub fn with_nonce(self, nonce: u64) -> Self {
        *self.node_nonce.lock().unwrap() = nonce;
        self
    }

    /// Advance the node nonce on every accepted submission
    pub fn with_nonce_tracking(mut self) -> Self {
        self.track_nonce = true;
        self
    }

    /// Amounts returned by `getAmountsOut`; by default the input is echoed
    pub fn with_quote(self, amounts: Vec<U256>) -> Self {
        *self.quote.lock().unwrap() = Some(amounts);
        self
    }

    /// Receipt status reported for every hash; `None` means never included
    pub fn with_receipt(self, status: Option<ReceiptStatus>) -> Self {
        *self.receipt.lock().unwrap() = status;
        self
    }

    /// Reject the n-th submission attempt (0-based)
    pub fn rejecting_submission(self, index: usize) -> Self {
        *self.reject_submission.lock().unwrap() = Some(index);
        self
    }

    pub fn failing_signing(mut self) -> Self {
        self.fail_signing = true;
        self
    }

    pub fn built_calls(&self) -> Vec<CallSpec> {
        self.built.lock().unwrap().clone()
    }

    pub fn submitted(&self) -> Vec<TxHash> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn get_balance(&self, _wallet: Address) -> Result<U256, ChainError> {
        Ok(*self.balance.lock().unwrap())
    }

    async fn token_balance(&self, _token: Address, _owner: Address) -> Result<U256, ChainError> {
        Ok(*self.token_balance.lock().unwrap())
    }

    async fn current_nonce(&self, _wallet: Address) -> Result<u64, ChainError> {
        Ok(*self.node_nonce.lock().unwrap())
    }

    async fn submit(&self, tx: &SignedTransaction) -> Result<TxHash, ChainError> {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            *attempts += 1;
            *attempts - 1
        };
        if *self.reject_submission.lock().unwrap() == Some(attempt) {
            return Err(ChainError::Rejected("insufficient funds for gas * price + value".into()));
        }
        self.submitted.lock().unwrap().push(tx.hash);
        if self.track_nonce {
            *self.node_nonce.lock().unwrap() = tx.nonce + 1;
        }
        Ok(tx.hash)
    }

    async fn transaction_receipt(&self, _hash: TxHash) -> Result<Option<ReceiptStatus>, ChainError> {
        Ok(*self.receipt.lock().unwrap())
    }

    async fn quote_amounts_out(
        &self,
        _router: Address,
        amount_in: U256,
        path: &[Address],
    ) -> Result<Vec<U256>, ChainError> {
        Ok(self
            .quote
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| vec![amount_in; path.len()]))
    }

    fn build_and_sign(
        &self,
        call: &CallSpec,
        _signer: &PrivateKeySigner,
    ) -> Result<SignedTransaction, ChainError> {
        if self.fail_signing {
            return Err(ChainError::Signing("mock signer refused".into()));
        }
        self.built.lock().unwrap().push(call.clone());

        let mut preimage = call.nonce.to_be_bytes().to_vec();
        preimage.extend_from_slice(&call.input);
        Ok(SignedTransaction {
            hash: keccak256(&preimage),
            nonce: call.nonce,
            raw: Bytes::from(preimage),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;
    use rust_decimal_macros::dec;

    const PAIR: Address = address!("2222222222222222222222222222222222222222");

    #[tokio::test]
    async fn test_mock_market_data_replays_script() {
        let mock = MockMarketData::new()
            .with_prices(PAIR, &[dec!(1.0), dec!(1.2)])
            .with_price_error(PAIR);

        assert_eq!(mock.get_price(PAIR).await.unwrap(), dec!(1.0));
        assert_eq!(mock.get_price(PAIR).await.unwrap(), dec!(1.2));
        assert!(matches!(
            mock.get_price(PAIR).await,
            Err(MarketDataError::BadStatus { status: 500, .. })
        ));
        assert!(matches!(
            mock.get_price(PAIR).await,
            Err(MarketDataError::NoPriceData(_))
        ));
        assert_eq!(mock.price_calls(PAIR), 4);
    }

    #[tokio::test]
    async fn test_mock_chain_rejects_scripted_submission() {
        let mock = MockChain::new().rejecting_submission(1);
        let signer = PrivateKeySigner::random();
        let call = CallSpec {
            to: PAIR,
            input: Bytes::new(),
            value: U256::ZERO,
            gas_limit: 21_000,
            gas_price: 1,
            nonce: 0,
        };

        let tx = mock.build_and_sign(&call, &signer).unwrap();
        assert!(mock.submit(&tx).await.is_ok());
        assert!(matches!(mock.submit(&tx).await, Err(ChainError::Rejected(_))));
        assert_eq!(mock.submitted().len(), 1);
    }
}
