pub mod abi;
pub mod rpc;
pub mod wallet;

pub use rpc::EvmClient;
pub use wallet::{WalletError, WalletManager, PRIVATE_KEY_ENV};
