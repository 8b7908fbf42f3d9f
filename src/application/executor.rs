//! Trade Executor
//!
//! Every trade is two transactions against the router: an ERC20 `approve`
//! followed, once the approval has settled, by the swap itself.
//! Nothing is retried and a failed swap does not undo its approval.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::signers::local::PrivateKeySigner;
use chrono::Utc;
use tokio::sync::Mutex;

use super::error::{TradeDirection, TradeError, TradeStep};
use crate::adapters::evm::abi;
use crate::domain::{min_output, BasisPoints};
use crate::ports::{CallSpec, ChainClient, ChainError, ReceiptStatus};

/// How the executor waits for an approval before sending the swap
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SettlementMode {
    /// Blind sleep; the swap may go out before the approval lands
    FixedDelay(Duration),
    /// Poll for the approval receipt, failing on revert or timeout
    Receipt { timeout: Duration, poll: Duration },
}

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub wallet: Address,
    pub router: Address,
    pub wrapped_native: Address,
    pub approve_gas_limit: u64,
    pub swap_gas_limit: u64,
    /// Flat gas price in wei
    pub gas_price: u128,
    pub deadline: Duration,
    pub slippage: BasisPoints,
    pub settlement: SettlementMode,
}

pub struct TradeExecutor {
    chain: Arc<dyn ChainClient>,
    signer: PrivateKeySigner,
    config: ExecutorConfig,
    /// Last nonce this executor broadcast with
    last_nonce: Mutex<Option<u64>>,
}

/// Never hand out a nonce at or below one already used, even if the node
/// has not caught up with our last broadcast yet.
fn next_nonce(node_nonce: u64, last_used: Option<u64>) -> u64 {
    match last_used {
        Some(last) if last >= node_nonce => last + 1,
        _ => node_nonce,
    }
}

impl TradeExecutor {
    pub fn new(chain: Arc<dyn ChainClient>, signer: PrivateKeySigner, config: ExecutorConfig) -> Self {
        Self {
            chain,
            signer,
            config,
            last_nonce: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Spend `native_amount` wei on `token`
    pub async fn buy(&self, token: Address, native_amount: U256) -> Result<TxHash, TradeError> {
        let direction = TradeDirection::Buy;
        tracing::info!(%token, amount = %native_amount, "Buying");

        self.approve(direction, token, native_amount).await?;

        let path = vec![self.config.wrapped_native, token];
        let amount_out_min = self.amount_out_min(direction, native_amount, &path).await?;
        let input = abi::encode_swap_native_for_tokens(
            amount_out_min,
            path,
            self.config.wallet,
            self.deadline(),
        );

        let hash = self
            .send(direction, TradeStep::Swap, self.config.router, input, native_amount, self.config.swap_gas_limit)
            .await?;
        tracing::info!(%token, tx = %hash, min_out = %amount_out_min, "Buy transaction sent");
        Ok(hash)
    }

    /// Swap `token_amount` of `token` back to native currency
    pub async fn sell(&self, token: Address, token_amount: U256) -> Result<TxHash, TradeError> {
        let direction = TradeDirection::Sell;
        tracing::info!(%token, amount = %token_amount, "Selling");

        self.approve(direction, token, token_amount).await?;

        let path = vec![token, self.config.wrapped_native];
        let amount_out_min = self.amount_out_min(direction, token_amount, &path).await?;
        let input = abi::encode_swap_tokens_for_native(
            token_amount,
            amount_out_min,
            path,
            self.config.wallet,
            self.deadline(),
        );

        let hash = self
            .send(direction, TradeStep::Swap, self.config.router, input, U256::ZERO, self.config.swap_gas_limit)
            .await?;
        tracing::info!(%token, tx = %hash, min_out = %amount_out_min, "Sell transaction sent");
        Ok(hash)
    }

    async fn approve(&self, direction: TradeDirection, token: Address, amount: U256) -> Result<(), TradeError> {
        let input = abi::encode_approve(self.config.router, amount);
        let hash = self
            .send(direction, TradeStep::Approve, token, input, U256::ZERO, self.config.approve_gas_limit)
            .await?;
        tracing::info!(%direction, %token, tx = %hash, "Approval transaction sent");

        self.settle(direction, hash).await
    }

    async fn settle(&self, direction: TradeDirection, hash: TxHash) -> Result<(), TradeError> {
        match self.config.settlement {
            SettlementMode::FixedDelay(delay) => {
                tracing::debug!(%direction, ?delay, "Waiting fixed settling delay");
                tokio::time::sleep(delay).await;
                Ok(())
            }
            SettlementMode::Receipt { timeout, poll } => {
                let wait_for_receipt = async {
                    loop {
                        match self.chain.transaction_receipt(hash).await {
                            Ok(Some(status)) => return status,
                            Ok(None) => {}
                            Err(e) => tracing::warn!(tx = %hash, error = %e, "Receipt lookup failed"),
                        }
                        tokio::time::sleep(poll).await;
                    }
                };

                let fail = |reason: String| TradeError::Transaction {
                    direction,
                    step: TradeStep::Approve,
                    reason,
                };
                match tokio::time::timeout(timeout, wait_for_receipt).await {
                    Ok(ReceiptStatus::Success) => {
                        tracing::debug!(%direction, tx = %hash, "Approval confirmed");
                        Ok(())
                    }
                    Ok(ReceiptStatus::Reverted) => Err(fail(format!("approval {hash} reverted"))),
                    Err(_) => Err(fail(format!("approval {hash} not included within {timeout:?}"))),
                }
            }
        }
    }

    /// Router quote less slippage. Full slippage skips the quote and bounds at zero.
    async fn amount_out_min(
        &self,
        direction: TradeDirection,
        amount_in: U256,
        path: &[Address],
    ) -> Result<U256, TradeError> {
        if self.config.slippage == BasisPoints::FULL {
            return Ok(U256::ZERO);
        }

        let fail = |reason: String| TradeError::Transaction {
            direction,
            step: TradeStep::Swap,
            reason,
        };
        let amounts = self
            .chain
            .quote_amounts_out(self.config.router, amount_in, path)
            .await
            .map_err(|e| fail(format!("quote failed: {e}")))?;
        let quoted = amounts
            .last()
            .copied()
            .ok_or_else(|| fail("router returned an empty quote".into()))?;

        Ok(min_output(quoted, self.config.slippage))
    }

    /// Nonce, sign, broadcast. The nonce lock is held across the whole
    /// sequence so two builds never share a nonce.
    async fn send(
        &self,
        direction: TradeDirection,
        step: TradeStep,
        to: Address,
        input: Bytes,
        value: U256,
        gas_limit: u64,
    ) -> Result<TxHash, TradeError> {
        let fail = |reason: String| TradeError::Transaction {
            direction,
            step,
            reason,
        };

        let mut last_nonce = self.last_nonce.lock().await;
        let node_nonce = self
            .chain
            .current_nonce(self.config.wallet)
            .await
            .map_err(|e| fail(e.to_string()))?;
        let nonce = next_nonce(node_nonce, *last_nonce);

        let call = CallSpec {
            to,
            input,
            value,
            gas_limit,
            gas_price: self.config.gas_price,
            nonce,
        };
        let signed = self
            .chain
            .build_and_sign(&call, &self.signer)
            .map_err(|e| fail(e.to_string()))?;

        let hash = self.chain.submit(&signed).await.map_err(|e| {
            if let ChainError::Rejected(ref reason) = e {
                tracing::error!(%direction, %step, nonce, %reason, "Node rejected transaction");
            }
            fail(e.to_string())
        })?;

        *last_nonce = Some(nonce);
        tracing::debug!(%direction, %step, nonce, tx = %hash, "Submitted");
        Ok(hash)
    }

    fn deadline(&self) -> U256 {
        let now = Utc::now().timestamp().max(0) as u64;
        U256::from(now + self.config.deadline.as_secs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::evm::abi::{IUniswapV2Router02, IERC20};
    use crate::ports::mocks::MockChain;
    use alloy::primitives::address;
    use alloy::sol_types::SolCall;

    const WALLET: Address = address!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266");
    const ROUTER: Address = address!("3fc91a3afd70395cd496c647d5a6cc9d4b2b7fad");
    const WETH: Address = address!("4200000000000000000000000000000000000006");
    const TOKEN: Address = address!("1111111111111111111111111111111111111111");

    fn config(slippage_bps: u64) -> ExecutorConfig {
        ExecutorConfig {
            wallet: WALLET,
            router: ROUTER,
            wrapped_native: WETH,
            approve_gas_limit: 100_000,
            swap_gas_limit: 2_000_000,
            gas_price: 50_000_000_000,
            deadline: Duration::from_secs(60),
            slippage: BasisPoints::from_fraction(rust_decimal::Decimal::new(slippage_bps as i64, 4)).unwrap(),
            settlement: SettlementMode::Receipt {
                timeout: Duration::from_millis(50),
                poll: Duration::from_millis(1),
            },
        }
    }

    fn executor(chain: Arc<MockChain>, config: ExecutorConfig) -> TradeExecutor {
        TradeExecutor::new(chain, PrivateKeySigner::random(), config)
    }

    #[test]
    fn test_next_nonce() {
        assert_eq!(next_nonce(5, None), 5);
        assert_eq!(next_nonce(5, Some(5)), 6);
        assert_eq!(next_nonce(5, Some(9)), 10);
        assert_eq!(next_nonce(12, Some(9)), 12);
    }

    #[tokio::test]
    async fn test_buy_builds_approve_then_swap() {
        let chain = Arc::new(MockChain::new().with_nonce(7).with_quote(vec![U256::from(100_000u64), U256::from(5_000u64)]));
        let executor = executor(chain.clone(), config(2_000));

        let hash = executor.buy(TOKEN, U256::from(100_000u64)).await.unwrap();

        let built = chain.built_calls();
        assert_eq!(built.len(), 2);

        let approve = &built[0];
        assert_eq!(approve.to, TOKEN);
        assert_eq!(approve.value, U256::ZERO);
        assert_eq!(approve.gas_limit, 100_000);
        let decoded = IERC20::approveCall::abi_decode(&approve.input).unwrap();
        assert_eq!(decoded.spender, ROUTER);
        assert_eq!(decoded.value, U256::from(100_000u64));

        let swap = &built[1];
        assert_eq!(swap.to, ROUTER);
        assert_eq!(swap.value, U256::from(100_000u64));
        assert_eq!(swap.gas_limit, 2_000_000);
        let decoded = IUniswapV2Router02::swapExactETHForTokensCall::abi_decode(&swap.input).unwrap();
        assert_eq!(decoded.path, vec![WETH, TOKEN]);
        assert_eq!(decoded.to, WALLET);
        // 5_000 quoted, 20% slippage
        assert_eq!(decoded.amountOutMin, U256::from(4_000u64));

        assert_eq!(chain.submitted().last(), Some(&hash));
    }

    #[tokio::test]
    async fn test_nonces_strictly_increase_when_node_lags() {
        // Node keeps reporting 7 as if nothing we sent had landed
        let chain = Arc::new(MockChain::new().with_nonce(7));
        let executor = executor(chain.clone(), config(2_000));

        executor.buy(TOKEN, U256::from(1_000u64)).await.unwrap();
        executor.sell(TOKEN, U256::from(1_000u64)).await.unwrap();

        let nonces: Vec<u64> = chain.built_calls().iter().map(|c| c.nonce).collect();
        assert_eq!(nonces, vec![7, 8, 9, 10]);
    }

    #[tokio::test]
    async fn test_nonces_follow_node_when_in_sync() {
        let chain = Arc::new(MockChain::new().with_nonce(3).with_nonce_tracking());
        let executor = executor(chain.clone(), config(2_000));

        executor.sell(TOKEN, U256::from(1_000u64)).await.unwrap();

        let nonces: Vec<u64> = chain.built_calls().iter().map(|c| c.nonce).collect();
        assert_eq!(nonces, vec![3, 4]);
    }

    #[tokio::test]
    async fn test_sell_builds_token_to_native_swap() {
        let chain = Arc::new(MockChain::new());
        let executor = executor(chain.clone(), config(10_000));

        executor.sell(TOKEN, U256::from(42u64)).await.unwrap();

        let built = chain.built_calls();
        assert_eq!(built.len(), 2);
        assert_eq!(built[0].to, TOKEN);
        let decoded = IUniswapV2Router02::swapExactTokensForETHCall::abi_decode(&built[1].input).unwrap();
        assert_eq!(decoded.amountIn, U256::from(42u64));
        assert_eq!(decoded.path, vec![TOKEN, WETH]);
        // Full slippage tolerance means an unbounded swap
        assert_eq!(decoded.amountOutMin, U256::ZERO);
        assert_eq!(built[1].value, U256::ZERO);
    }

    #[tokio::test]
    async fn test_deadline_is_a_minute_out() {
        let chain = Arc::new(MockChain::new());
        let executor = executor(chain.clone(), config(2_000));
        let before = Utc::now().timestamp() as u64;

        executor.buy(TOKEN, U256::from(1u64)).await.unwrap();

        let swap = &chain.built_calls()[1];
        let decoded = IUniswapV2Router02::swapExactETHForTokensCall::abi_decode(&swap.input).unwrap();
        let deadline: u64 = decoded.deadline.to::<u64>();
        assert!(deadline >= before + 60);
        assert!(deadline <= Utc::now().timestamp() as u64 + 60);
    }

    #[tokio::test]
    async fn test_reverted_approval_stops_before_swap() {
        let chain = Arc::new(MockChain::new().with_receipt(Some(ReceiptStatus::Reverted)));
        let executor = executor(chain.clone(), config(2_000));

        let err = executor.buy(TOKEN, U256::from(1u64)).await.unwrap_err();
        assert!(matches!(
            err,
            TradeError::Transaction { direction: TradeDirection::Buy, step: TradeStep::Approve, .. }
        ));
        assert_eq!(chain.built_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_approval_never_included_times_out() {
        let chain = Arc::new(MockChain::new().with_receipt(None));
        let executor = executor(chain.clone(), config(2_000));

        let err = executor.sell(TOKEN, U256::from(1u64)).await.unwrap_err();
        assert!(matches!(
            err,
            TradeError::Transaction { direction: TradeDirection::Sell, step: TradeStep::Approve, .. }
        ));
        assert!(err.to_string().contains("not included"));
    }

    #[tokio::test]
    async fn test_fixed_delay_skips_receipts() {
        let chain = Arc::new(MockChain::new().with_receipt(None));
        let mut config = config(2_000);
        config.settlement = SettlementMode::FixedDelay(Duration::ZERO);
        let executor = executor(chain.clone(), config);

        executor.buy(TOKEN, U256::from(1u64)).await.unwrap();
        assert_eq!(chain.submitted().len(), 2);
    }

    #[tokio::test]
    async fn test_rejected_swap_reports_swap_step() {
        let chain = Arc::new(MockChain::new().rejecting_submission(1));
        let executor = executor(chain.clone(), config(2_000));

        let err = executor.buy(TOKEN, U256::from(1u64)).await.unwrap_err();
        match err {
            TradeError::Transaction { direction, step, reason } => {
                assert_eq!(direction, TradeDirection::Buy);
                assert_eq!(step, TradeStep::Swap);
                assert!(reason.contains("insufficient funds"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_rejected_nonce_is_reused() {
        // First submission rejected: its nonce was never consumed
        let chain = Arc::new(MockChain::new().with_nonce(4).rejecting_submission(0));
        let executor = executor(chain.clone(), config(2_000));

        assert!(executor.buy(TOKEN, U256::from(1u64)).await.is_err());
        executor.buy(TOKEN, U256::from(1u64)).await.unwrap();

        let nonces: Vec<u64> = chain.built_calls().iter().map(|c| c.nonce).collect();
        assert_eq!(nonces, vec![4, 4, 5]);
    }

    #[tokio::test]
    async fn test_signing_failure_surfaces_as_transaction_error() {
        let chain = Arc::new(MockChain::new().failing_signing());
        let executor = executor(chain.clone(), config(2_000));

        let err = executor.buy(TOKEN, U256::from(1u64)).await.unwrap_err();
        assert!(matches!(
            err,
            TradeError::Transaction { step: TradeStep::Approve, .. }
        ));
        assert!(chain.submitted().is_empty());
    }
}
