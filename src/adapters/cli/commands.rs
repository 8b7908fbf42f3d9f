//! CLI Command Definitions
//!
//! Argument parsing for the base-sniper binary.

use alloy::primitives::Address;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// base-sniper - New-pair sniper for Base
#[derive(Parser, Debug)]
#[command(
    name = "base-sniper",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = "New-pair sniper for Base",
    long_about = "Discovers freshly listed Base pairs on DexScreener, keeps only tokens with a \
                  perfect TokenSniffer score, buys with a fixed share of the wallet and sells \
                  once the price reaches the profit target."
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE", default_value = "config/base.toml")]
    pub config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one discovery pass and trade every accepted candidate
    Run(RunCmd),

    /// List discovered pairs with their scores, without trading
    Discover,

    /// Show the current USD price of a pair
    Price(PriceCmd),

    /// Show the TokenSniffer score of a token
    Score(ScoreCmd),

    /// Show wallet balance, nonce and chain id
    Status,
}

/// Trade one discovery batch
#[derive(Parser, Debug)]
pub struct RunCmd {
    /// Acknowledge risk of financial loss (required to broadcast transactions)
    #[arg(long, help = "Acknowledge risk of financial loss")]
    pub i_accept_losses: bool,

    /// Override RPC URL
    #[arg(long, value_name = "URL")]
    pub rpc_url: Option<String>,
}

#[derive(Parser, Debug)]
pub struct PriceCmd {
    /// Pair contract address
    #[arg(value_name = "PAIR")]
    pub pair: Address,
}

#[derive(Parser, Debug)]
pub struct ScoreCmd {
    /// Token contract address
    #[arg(value_name = "TOKEN")]
    pub token: Address,
}
