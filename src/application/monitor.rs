//! Price Monitor
//!
//! Polls the pair price at a fixed interval until an exit condition fires.
//! The first poll happens immediately after entry, then one every interval.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::error::TradeError;
use crate::domain::{ExitPolicy, ExitReason, Position};
use crate::ports::MarketDataSource;

/// Shared stop flag, flipped by the shutdown signal handler
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<RwLock<bool>>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn stop(&self) {
        *self.0.write().await = true;
    }

    pub async fn is_stopped(&self) -> bool {
        *self.0.read().await
    }
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub poll_interval: Duration,
    /// Exit once price falls this fraction below entry
    pub stop_loss_fraction: Option<Decimal>,
    /// Exit once the position has been held this long
    pub max_duration: Option<Duration>,
    /// Consecutive failed price reads tolerated before giving up
    pub price_error_tolerance: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            stop_loss_fraction: None,
            max_duration: None,
            price_error_tolerance: 0,
        }
    }
}

/// Why monitoring ended and the last price seen
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorExit {
    pub reason: ExitReason,
    pub price: Option<Decimal>,
}

pub struct PriceMonitor {
    market: Arc<dyn MarketDataSource>,
    config: MonitorConfig,
    stop: StopHandle,
}

impl PriceMonitor {
    pub fn new(market: Arc<dyn MarketDataSource>, config: MonitorConfig, stop: StopHandle) -> Self {
        Self { market, config, stop }
    }

    /// Block until the position should be closed.
    ///
    /// A price read failure beyond the configured tolerance ends monitoring
    /// with `DataUnavailable`; the position is then still open on chain.
    pub async fn watch(&self, position: &Position) -> Result<MonitorExit, TradeError> {
        let policy = ExitPolicy::for_position(
            position,
            self.config.stop_loss_fraction,
            self.config.max_duration,
        );
        let started = Instant::now();
        let mut last_price = None;
        let mut failures = 0u32;

        loop {
            if self.stop.is_stopped().await {
                tracing::warn!(pair = %position.pair_address, "Stop requested, closing position");
                return Ok(MonitorExit {
                    reason: ExitReason::Stopped,
                    price: last_price,
                });
            }

            match self.market.get_price(position.pair_address).await {
                Ok(price) => {
                    failures = 0;
                    last_price = Some(price);
                    tracing::info!(
                        pair = %position.pair_address,
                        %price,
                        target = %position.target_price,
                        pnl_pct = %position.pnl_pct(price).round_dp(2),
                        "Price check"
                    );

                    if let Some(reason) = policy.evaluate(price, started.elapsed()) {
                        tracing::info!(pair = %position.pair_address, %price, %reason, "Exit condition met");
                        return Ok(MonitorExit {
                            reason,
                            price: Some(price),
                        });
                    }
                }
                Err(e) => {
                    failures += 1;
                    if failures > self.config.price_error_tolerance {
                        return Err(e.into());
                    }
                    tracing::warn!(
                        pair = %position.pair_address,
                        error = %e,
                        failures,
                        "Price read failed"
                    );

                    if policy.is_expired(started.elapsed()) {
                        return Ok(MonitorExit {
                            reason: ExitReason::Timeout,
                            price: last_price,
                        });
                    }
                }
            }

            tokio::time::sleep(self.config.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Candidate, DiscoveredPair};
    use crate::ports::mocks::MockMarketData;
    use alloy::primitives::{address, Address, U256};
    use rust_decimal_macros::dec;

    const TOKEN: Address = address!("1111111111111111111111111111111111111111");
    const PAIR: Address = address!("2222222222222222222222222222222222222222");

    fn position(initial: Decimal) -> Position {
        let candidate = Candidate::new(
            DiscoveredPair {
                token_address: TOKEN,
                pair_address: PAIR,
            },
            100,
        );
        Position::open(&candidate, U256::from(1_000u64), initial, dec!(1.5)).unwrap()
    }

    fn fast_config() -> MonitorConfig {
        MonitorConfig {
            poll_interval: Duration::from_millis(1),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_exits_on_first_price_at_target() {
        let market = Arc::new(
            MockMarketData::new().with_prices(PAIR, &[dec!(1.0), dec!(1.2), dec!(1.4), dec!(1.5), dec!(1.6)]),
        );
        let monitor = PriceMonitor::new(market.clone(), fast_config(), StopHandle::new());

        let exit = monitor.watch(&position(dec!(1.0))).await.unwrap();

        assert_eq!(exit.reason, ExitReason::TargetReached);
        assert_eq!(exit.price, Some(dec!(1.5)));
        assert_eq!(market.price_calls(PAIR), 4);
        assert_eq!(market.remaining_prices(PAIR), 1);
    }

    #[tokio::test]
    async fn test_price_failure_surfaces_data_unavailable() {
        let market = Arc::new(
            MockMarketData::new()
                .with_prices(PAIR, &[dec!(1.1)])
                .with_price_error(PAIR)
                .with_prices(PAIR, &[dec!(2.0)]),
        );
        let monitor = PriceMonitor::new(market.clone(), fast_config(), StopHandle::new());

        let err = monitor.watch(&position(dec!(1.0))).await.unwrap_err();

        assert!(matches!(err, TradeError::DataUnavailable(_)));
        assert_eq!(market.price_calls(PAIR), 2);
    }

    #[tokio::test]
    async fn test_tolerated_failures_keep_polling() {
        let market = Arc::new(
            MockMarketData::new()
                .with_price_error(PAIR)
                .with_price_error(PAIR)
                .with_prices(PAIR, &[dec!(1.5)]),
        );
        let config = MonitorConfig {
            price_error_tolerance: 2,
            ..fast_config()
        };
        let monitor = PriceMonitor::new(market, config, StopHandle::new());

        let exit = monitor.watch(&position(dec!(1.0))).await.unwrap();
        assert_eq!(exit.reason, ExitReason::TargetReached);
    }

    #[tokio::test]
    async fn test_stop_loss_exit() {
        let market = Arc::new(MockMarketData::new().with_prices(PAIR, &[dec!(0.95), dec!(0.7)]));
        let config = MonitorConfig {
            stop_loss_fraction: Some(dec!(0.25)),
            ..fast_config()
        };
        let monitor = PriceMonitor::new(market, config, StopHandle::new());

        let exit = monitor.watch(&position(dec!(1.0))).await.unwrap();
        assert_eq!(exit.reason, ExitReason::StopLoss);
        assert_eq!(exit.price, Some(dec!(0.7)));
    }

    #[tokio::test]
    async fn test_timeout_exit() {
        let flat = vec![dec!(1.0); 10_000];
        let market = Arc::new(MockMarketData::new().with_prices(PAIR, &flat));
        let config = MonitorConfig {
            max_duration: Some(Duration::from_millis(20)),
            ..fast_config()
        };
        let monitor = PriceMonitor::new(market, config, StopHandle::new());

        let exit = monitor.watch(&position(dec!(1.0))).await.unwrap();
        assert_eq!(exit.reason, ExitReason::Timeout);
        assert_eq!(exit.price, Some(dec!(1.0)));
    }

    #[tokio::test]
    async fn test_stop_before_first_poll() {
        let market = Arc::new(MockMarketData::new().with_prices(PAIR, &[dec!(1.0)]));
        let stop = StopHandle::new();
        stop.stop().await;
        let monitor = PriceMonitor::new(market.clone(), fast_config(), stop);

        let exit = monitor.watch(&position(dec!(1.0))).await.unwrap();
        assert_eq!(exit.reason, ExitReason::Stopped);
        assert_eq!(exit.price, None);
        assert_eq!(market.price_calls(PAIR), 0);
    }

    #[tokio::test]
    async fn test_stop_handle_is_shared() {
        let stop = StopHandle::new();
        let clone = stop.clone();
        assert!(!stop.is_stopped().await);
        clone.stop().await;
        assert!(stop.is_stopped().await);
    }
}
