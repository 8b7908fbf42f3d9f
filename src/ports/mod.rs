//! Ports Layer - Trait definitions for external dependencies
//!
//! This module defines the interfaces (ports) that adapters must implement.
//! Following hexagonal architecture, these traits abstract:
//! - Pair discovery and pair prices (DexScreener)
//! - Token risk scoring (TokenSniffer)
//! - Blockchain node access and transaction signing (EVM JSON-RPC)

pub mod chain;
pub mod market_data;
pub mod mocks;
pub mod risk;

pub use chain::{CallSpec, ChainClient, ChainError, ReceiptStatus, SignedTransaction};
pub use market_data::{MarketDataError, MarketDataSource};
pub use risk::RiskScorer;
