//! Trade Lifecycle Controller
//!
//! Runs one discovery pass and walks every discovered pair through
//! filter → size → buy → monitor → sell, strictly one at a time.
//! A failure is contained to the candidate it happened on; only a failed
//! discovery call fails the whole pass.

use std::sync::Arc;

use alloy::primitives::{Address, TxHash, U256};
use rust_decimal::Decimal;

use super::error::TradeError;
use super::executor::TradeExecutor;
use super::monitor::{MonitorConfig, PriceMonitor, StopHandle};
use crate::domain::{
    purchase_amount, BasisPoints, Candidate, DiscoveredPair, ExitReason, Position, PositionError,
    SellSizing,
};
use crate::ports::{ChainClient, MarketDataSource, RiskScorer};

#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    pub wallet: Address,
    /// Share of the native balance spent per buy
    pub position_fraction: BasisPoints,
    pub profit_multiplier: Decimal,
    pub monitor: MonitorConfig,
    pub sell_sizing: SellSizing,
}

/// A candidate that was accepted but did not make it to a completed sell
#[derive(Debug)]
pub struct CandidateFailure {
    pub token_address: Address,
    pub pair_address: Address,
    /// Set once the buy swap was broadcast; the tokens may still be held
    pub buy_tx: Option<TxHash>,
    pub error: TradeError,
}

/// A full buy → sell round trip
#[derive(Debug, Clone)]
pub struct TradeOutcome {
    pub token_address: Address,
    pub pair_address: Address,
    pub purchase_amount: U256,
    pub sold_amount: U256,
    pub initial_price: Decimal,
    pub target_price: Decimal,
    pub exit_price: Option<Decimal>,
    pub reason: ExitReason,
    pub buy_tx: TxHash,
    pub sell_tx: TxHash,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub discovered: usize,
    pub rejected: Vec<Candidate>,
    pub failed: Vec<CandidateFailure>,
    pub completed: Vec<TradeOutcome>,
    /// Candidates not attempted because a stop was requested
    pub skipped: usize,
}

impl RunReport {
    /// Candidates whose buy swap went out, sold or not
    pub fn bought(&self) -> usize {
        self.completed.len() + self.failed.iter().filter(|f| f.buy_tx.is_some()).count()
    }
}

pub struct TradeLifecycleController {
    market: Arc<dyn MarketDataSource>,
    scorer: Arc<dyn RiskScorer>,
    chain: Arc<dyn ChainClient>,
    executor: TradeExecutor,
    monitor: PriceMonitor,
    config: LifecycleConfig,
    stop: StopHandle,
}

impl TradeLifecycleController {
    pub fn new(
        market: Arc<dyn MarketDataSource>,
        scorer: Arc<dyn RiskScorer>,
        chain: Arc<dyn ChainClient>,
        executor: TradeExecutor,
        config: LifecycleConfig,
    ) -> Self {
        let stop = StopHandle::new();
        let monitor = PriceMonitor::new(Arc::clone(&market), config.monitor.clone(), stop.clone());
        Self {
            market,
            scorer,
            chain,
            executor,
            monitor,
            config,
            stop,
        }
    }

    /// Handle for requesting a stop from another task
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub async fn run_once(&self) -> Result<RunReport, TradeError> {
        let pairs = self.market.discover_candidates().await?;
        tracing::info!(count = pairs.len(), "Discovery complete");

        let mut report = RunReport {
            discovered: pairs.len(),
            ..Default::default()
        };

        for (i, pair) in pairs.iter().enumerate() {
            if self.stop.is_stopped().await {
                report.skipped = pairs.len() - i;
                tracing::warn!(skipped = report.skipped, "Stop requested, not starting new trades");
                break;
            }

            let candidate = self.score(*pair).await;
            if !candidate.is_accepted() {
                tracing::info!(
                    token = %candidate.token_address,
                    score = candidate.score,
                    "Rejected"
                );
                report.rejected.push(candidate);
                continue;
            }

            match self.trade(&candidate).await {
                Ok(outcome) => report.completed.push(outcome),
                Err(failure) => {
                    tracing::error!(
                        token = %failure.token_address,
                        pair = %failure.pair_address,
                        bought = failure.buy_tx.is_some(),
                        error = %failure.error,
                        "Candidate failed"
                    );
                    report.failed.push(failure);
                }
            }
        }

        Ok(report)
    }

    async fn score(&self, pair: DiscoveredPair) -> Candidate {
        let score = self.scorer.get_score(pair.token_address).await;
        Candidate::new(pair, score)
    }

    async fn trade(&self, candidate: &Candidate) -> Result<TradeOutcome, CandidateFailure> {
        let failure = |buy_tx: Option<TxHash>, error: TradeError| CandidateFailure {
            token_address: candidate.token_address,
            pair_address: candidate.pair_address,
            buy_tx,
            error,
        };

        let (amount, buy_tx) = self.buy(candidate).await.map_err(|e| failure(None, e))?;
        self.hold_and_sell(candidate, amount, buy_tx)
            .await
            .map_err(|e| failure(Some(buy_tx), e))
    }

    async fn buy(&self, candidate: &Candidate) -> Result<(U256, TxHash), TradeError> {
        let token = candidate.token_address;

        let balance = self.chain.get_balance(self.config.wallet).await?;
        let amount = purchase_amount(balance, self.config.position_fraction);
        if amount.is_zero() {
            return Err(PositionError::ZeroAmount.into());
        }
        tracing::info!(%token, %balance, %amount, "Sized position");

        let buy_tx = self.executor.buy(token, amount).await?;
        Ok((amount, buy_tx))
    }

    /// Tokens are held from here on; any early return leaves them in the wallet
    async fn hold_and_sell(
        &self,
        candidate: &Candidate,
        amount: U256,
        buy_tx: TxHash,
    ) -> Result<TradeOutcome, TradeError> {
        let token = candidate.token_address;
        let pair = candidate.pair_address;

        let position = match self.open_position(candidate, amount).await {
            Ok(position) => position,
            Err(e) => {
                tracing::error!(%token, %pair, tx = %buy_tx, "Could not establish entry price, position left open");
                return Err(e);
            }
        };
        tracing::info!(
            %token,
            %pair,
            initial = %position.initial_price,
            target = %position.target_price,
            "Position opened"
        );

        let exit = match self.monitor.watch(&position).await {
            Ok(exit) => exit,
            Err(e) => {
                tracing::error!(%token, %pair, error = %e, "Monitoring aborted, position left open");
                return Err(e);
            }
        };

        let sold_amount = match self.config.sell_sizing {
            SellSizing::PurchaseAmount => position.purchase_amount,
            SellSizing::TokenBalance => self.chain.token_balance(token, self.config.wallet).await?,
        };
        let sell_tx = self.executor.sell(token, sold_amount).await?;

        tracing::info!(
            %token,
            reason = %exit.reason,
            price = ?exit.price,
            buy_tx = %buy_tx,
            sell_tx = %sell_tx,
            "Trade closed"
        );

        Ok(TradeOutcome {
            token_address: token,
            pair_address: pair,
            purchase_amount: position.purchase_amount,
            sold_amount,
            initial_price: position.initial_price,
            target_price: position.target_price,
            exit_price: exit.price,
            reason: exit.reason,
            buy_tx,
            sell_tx,
        })
    }

    async fn open_position(&self, candidate: &Candidate, amount: U256) -> Result<Position, TradeError> {
        let initial_price = self.market.get_price(candidate.pair_address).await?;
        Ok(Position::open(
            candidate,
            amount,
            initial_price,
            self.config.profit_multiplier,
        )?)
    }
}
