//! Adapters Layer - External System Implementations
//!
//! This module contains implementations of the port traits:
//! - DexScreener: new-pair discovery and pair prices
//! - TokenSniffer: token risk scores
//! - EVM: JSON-RPC node client, signing wallet and contract bindings
//! - CLI: Command-line interface definitions

pub mod cli;
pub mod dexscreener;
pub mod evm;
pub mod tokensniffer;

pub use cli::CliApp;
pub use dexscreener::{DexScreenerClient, DexScreenerConfig};
pub use evm::{EvmClient, WalletManager};
pub use tokensniffer::{TokenSnifferClient, TokenSnifferConfig};
