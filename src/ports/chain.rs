use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("Cannot reach node: {0}")]
    Connectivity(String),
    #[error("RPC request failed: {0}")]
    Rpc(String),
    #[error("Signing failed: {0}")]
    Signing(String),
    #[error("Transaction rejected by node: {0}")]
    Rejected(String),
    #[error("Contract call failed: {0}")]
    Call(String),
}

/// Everything needed to build one legacy (flat gas price) transaction
#[derive(Debug, Clone, PartialEq)]
pub struct CallSpec {
    pub to: Address,
    pub input: Bytes,
    pub value: U256,
    pub gas_limit: u64,
    pub gas_price: u128,
    pub nonce: u64,
}

/// RLP-encoded, signed transaction ready for broadcast
#[derive(Debug, Clone, PartialEq)]
pub struct SignedTransaction {
    pub hash: TxHash,
    pub nonce: u64,
    pub raw: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    Success,
    Reverted,
}

/// Blockchain node access for a single EVM chain
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Native balance in wei
    async fn get_balance(&self, wallet: Address) -> Result<U256, ChainError>;

    /// ERC20 `balanceOf(owner)`
    async fn token_balance(&self, token: Address, owner: Address) -> Result<U256, ChainError>;

    /// Next nonce the node expects, counting pending transactions
    async fn current_nonce(&self, wallet: Address) -> Result<u64, ChainError>;

    /// Broadcast only; does not wait for inclusion
    async fn submit(&self, tx: &SignedTransaction) -> Result<TxHash, ChainError>;

    /// `None` while the transaction is not yet included
    async fn transaction_receipt(&self, hash: TxHash) -> Result<Option<ReceiptStatus>, ChainError>;

    /// Router `getAmountsOut(amount_in, path)`
    async fn quote_amounts_out(
        &self,
        router: Address,
        amount_in: U256,
        path: &[Address],
    ) -> Result<Vec<U256>, ChainError>;

    fn build_and_sign(
        &self,
        call: &CallSpec,
        signer: &PrivateKeySigner,
    ) -> Result<SignedTransaction, ChainError>;
}
