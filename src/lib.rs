//! base-sniper - New-pair sniper library for Base
//!
//! Discovers freshly listed DEX pairs, keeps only tokens with a perfect risk
//! score, buys with a fixed share of the wallet and sells at a profit multiple.
//!
//! # Modules
//!
//! - `domain`: Core trading rules (Candidate, Position, ExitPolicy, BasisPoints)
//! - `ports`: Trait abstractions (MarketDataSource, RiskScorer, ChainClient)
//! - `adapters`: External implementations (DexScreener, TokenSniffer, EVM, CLI)
//! - `config`: Configuration loading and validation
//! - `application`: Trade executor, price monitor and lifecycle controller

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod config;
pub mod application;
