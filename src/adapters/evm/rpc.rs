use alloy::consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Encodable2718;
use alloy::network::TxSignerSync;
use alloy::primitives::{Address, Bytes, TxHash, TxKind, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::{TransactionInput, TransactionRequest};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol_types::SolCall;
use alloy::transports::TransportError;
use async_trait::async_trait;

use super::abi::{encode_balance_of, encode_get_amounts_out, IUniswapV2Router02, IERC20};
use crate::ports::chain::{CallSpec, ChainClient, ChainError, ReceiptStatus, SignedTransaction};

/// JSON-RPC client for a single EVM chain
#[derive(Clone)]
pub struct EvmClient {
    provider: DynProvider,
    chain_id: u64,
}

impl EvmClient {
    /// Connect and confirm the node answers `eth_chainId`.
    ///
    /// Failure here is the startup connectivity check.
    pub async fn connect(rpc_url: &str) -> Result<Self, ChainError> {
        let provider = Self::provider(rpc_url)?;
        let chain_id = provider
            .get_chain_id()
            .await
            .map_err(|e| ChainError::Connectivity(format!("{rpc_url}: {e}")))?;

        tracing::info!(chain_id, "Connected to node");
        Ok(Self { provider, chain_id })
    }

    /// Build a client for a known chain id without touching the network
    pub fn with_chain_id(rpc_url: &str, chain_id: u64) -> Result<Self, ChainError> {
        Ok(Self {
            provider: Self::provider(rpc_url)?,
            chain_id,
        })
    }

    fn provider(rpc_url: &str) -> Result<DynProvider, ChainError> {
        let url: reqwest::Url = rpc_url
            .parse()
            .map_err(|e| ChainError::Connectivity(format!("Invalid RPC URL '{rpc_url}': {e}")))?;
        Ok(ProviderBuilder::new()
            .disable_recommended_fillers()
            .connect_http(url)
            .erased())
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn eth_call(&self, to: Address, input: Bytes) -> Result<Bytes, ChainError> {
        let request = TransactionRequest::default()
            .to(to)
            .input(TransactionInput::new(input));
        self.provider
            .call(request)
            .await
            .map_err(|e| ChainError::Call(e.to_string()))
    }
}

/// Node-side rejections carry a JSON-RPC error payload; everything else is transport.
fn classify_submit_error(err: TransportError) -> ChainError {
    match err.as_error_resp() {
        Some(payload) => ChainError::Rejected(payload.message.to_string()),
        None => ChainError::Rpc(err.to_string()),
    }
}

#[async_trait]
impl ChainClient for EvmClient {
    async fn get_balance(&self, wallet: Address) -> Result<U256, ChainError> {
        self.provider
            .get_balance(wallet)
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))
    }

    async fn token_balance(&self, token: Address, owner: Address) -> Result<U256, ChainError> {
        let output = self.eth_call(token, encode_balance_of(owner)).await?;
        IERC20::balanceOfCall::abi_decode_returns(&output)
            .map_err(|e| ChainError::Call(format!("balanceOf decode: {e}")))
    }

    async fn current_nonce(&self, wallet: Address) -> Result<u64, ChainError> {
        self.provider
            .get_transaction_count(wallet)
            .pending()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))
    }

    async fn submit(&self, tx: &SignedTransaction) -> Result<TxHash, ChainError> {
        let pending = self
            .provider
            .send_raw_transaction(&tx.raw)
            .await
            .map_err(classify_submit_error)?;
        Ok(*pending.tx_hash())
    }

    async fn transaction_receipt(&self, hash: TxHash) -> Result<Option<ReceiptStatus>, ChainError> {
        let receipt = self
            .provider
            .get_transaction_receipt(hash)
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;

        Ok(receipt.map(|r| {
            if r.status() {
                ReceiptStatus::Success
            } else {
                ReceiptStatus::Reverted
            }
        }))
    }

    async fn quote_amounts_out(
        &self,
        router: Address,
        amount_in: U256,
        path: &[Address],
    ) -> Result<Vec<U256>, ChainError> {
        let output = self
            .eth_call(router, encode_get_amounts_out(amount_in, path.to_vec()))
            .await?;
        IUniswapV2Router02::getAmountsOutCall::abi_decode_returns(&output)
            .map_err(|e| ChainError::Call(format!("getAmountsOut decode: {e}")))
    }

    fn build_and_sign(
        &self,
        call: &CallSpec,
        signer: &PrivateKeySigner,
    ) -> Result<SignedTransaction, ChainError> {
        let mut tx = TxLegacy {
            chain_id: Some(self.chain_id),
            nonce: call.nonce,
            gas_price: call.gas_price,
            gas_limit: call.gas_limit,
            to: TxKind::Call(call.to),
            value: call.value,
            input: call.input.clone(),
        };

        let signature = signer
            .sign_transaction_sync(&mut tx)
            .map_err(|e| ChainError::Signing(e.to_string()))?;
        let signed = tx.into_signed(signature);
        let hash = *signed.hash();
        let raw = TxEnvelope::Legacy(signed).encoded_2718();

        Ok(SignedTransaction {
            hash,
            nonce: call.nonce,
            raw: raw.into(),
        })
    }
}
