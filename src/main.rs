//! base-sniper - New-pair sniper for Base
//!
//! Buys freshly listed tokens that pass a perfect risk score and sells them
//! at a fixed profit multiple.

use std::path::Path;
use std::sync::Arc;

use alloy::primitives::utils::format_ether;
use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use base_sniper::adapters::cli::{CliApp, Command, PriceCmd, RunCmd, ScoreCmd};
use base_sniper::adapters::{DexScreenerClient, DexScreenerConfig, EvmClient, TokenSnifferClient, TokenSnifferConfig, WalletManager};
use base_sniper::application::{ExecutorConfig, LifecycleConfig, RunReport, TradeExecutor, TradeLifecycleController};
use base_sniper::config::{load_config, Config};
use base_sniper::domain::Candidate;
use base_sniper::ports::{ChainClient, MarketDataSource, RiskScorer};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load .env file if it exists (PRIVATE_KEY goes here, never in the config file)
    dotenvy::dotenv().ok();

    let app = CliApp::parse();
    let config = load(&app.config);
    let level = config.as_ref().map(|c| c.logging.level.as_str()).unwrap_or("warn");
    init_logging(app.verbose, app.debug, level)?;
    let config = config?;

    match app.command {
        Command::Run(cmd) => run_command(cmd, config).await,
        Command::Discover => discover_command(config).await,
        Command::Price(cmd) => price_command(cmd, config).await,
        Command::Score(cmd) => score_command(cmd, config).await,
        Command::Status => status_command(config).await,
    }
}

fn init_logging(verbose: bool, debug: bool, level: &str) -> Result<()> {
    let filter = if debug {
        EnvFilter::new("debug")
    } else if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    fmt().with_env_filter(filter).init();
    Ok(())
}

fn load(path: &Path) -> Result<Config> {
    let expanded = shellexpand::tilde(&path.to_string_lossy()).to_string();
    load_config(&expanded).with_context(|| format!("Failed to load configuration from {expanded}"))
}

/// Connect and make sure the node serves the configured chain
async fn connect(config: &Config, rpc_override: Option<String>) -> Result<EvmClient> {
    let rpc_url = rpc_override.unwrap_or_else(|| config.chain.get_rpc_url());
    let client = EvmClient::connect(&rpc_url)
        .await
        .context("Cannot reach blockchain node")?;

    if client.chain_id() != config.chain.chain_id {
        bail!(
            "Node reports chain id {} but config expects {}",
            client.chain_id(),
            config.chain.chain_id
        );
    }
    Ok(client)
}

async fn run_command(cmd: RunCmd, config: Config) -> Result<()> {
    if !cmd.i_accept_losses {
        bail!(
            "Trading broadcasts real transactions and can lose funds.\n\
             Re-run with --i-accept-losses to continue."
        );
    }
    tracing::info!("Starting base-sniper...");

    let chain: Arc<dyn ChainClient> = Arc::new(connect(&config, cmd.rpc_url).await?);

    let wallet = WalletManager::from_env().context("Failed to load signing key")?;
    wallet
        .verify_address(config.chain.wallet()?)
        .context("Signing key does not belong to the configured wallet")?;
    tracing::info!(wallet = %wallet.address(), "Wallet loaded");

    let market: Arc<dyn MarketDataSource> = Arc::new(
        DexScreenerClient::new(DexScreenerConfig::from(&config))
            .context("Failed to create DexScreener client")?,
    );
    let scorer: Arc<dyn RiskScorer> = Arc::new(
        TokenSnifferClient::new(TokenSnifferConfig::from(&config))
            .context("Failed to create TokenSniffer client")?,
    );

    let executor = TradeExecutor::new(
        Arc::clone(&chain),
        wallet.signer().clone(),
        ExecutorConfig::try_from(&config)?,
    );
    let controller = TradeLifecycleController::new(
        market,
        scorer,
        chain,
        executor,
        LifecycleConfig::try_from(&config)?,
    );

    // Setup Ctrl+C handler
    let stop = controller.stop_handle();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Shutdown signal received");
        stop.stop().await;
    });

    let report = controller.run_once().await?;
    log_report(&report);
    tracing::info!("base-sniper stopped");
    Ok(())
}

fn log_report(report: &RunReport) {
    tracing::info!(
        discovered = report.discovered,
        rejected = report.rejected.len(),
        failed = report.failed.len(),
        bought = report.bought(),
        completed = report.completed.len(),
        skipped = report.skipped,
        "Run complete"
    );
    for outcome in &report.completed {
        tracing::info!(
            token = %outcome.token_address,
            reason = %outcome.reason,
            initial = %outcome.initial_price,
            exit = ?outcome.exit_price,
            buy_tx = %outcome.buy_tx,
            sell_tx = %outcome.sell_tx,
            "Completed trade"
        );
    }
    for failure in &report.failed {
        tracing::warn!(
            token = %failure.token_address,
            pair = %failure.pair_address,
            buy_tx = ?failure.buy_tx,
            error = %failure.error,
            "Failed trade"
        );
    }
}

async fn discover_command(config: Config) -> Result<()> {
    let market = DexScreenerClient::new(DexScreenerConfig::from(&config))?;
    let scorer = TokenSnifferClient::new(TokenSnifferConfig::from(&config))?;

    let pairs = market
        .discover_candidates()
        .await
        .context("Discovery failed")?;
    println!("Discovered {} pairs", pairs.len());

    for pair in pairs {
        let candidate = Candidate::new(pair, scorer.get_score(pair.token_address).await);
        println!(
            "{} {:#x} pair {:#x} score {:>3}",
            if candidate.is_accepted() { "ACCEPT" } else { "reject" },
            candidate.token_address,
            candidate.pair_address,
            candidate.score
        );
    }
    Ok(())
}

async fn price_command(cmd: PriceCmd, config: Config) -> Result<()> {
    let market = DexScreenerClient::new(DexScreenerConfig::from(&config))?;
    let price = market
        .get_price(cmd.pair)
        .await
        .context("Failed to get price")?;

    println!("Pair {:#x}: ${}", cmd.pair, price);
    println!(
        "Target at {}x: ${}",
        config.trading.profit_multiplier,
        price * config.trading.profit_multiplier
    );
    Ok(())
}

async fn score_command(cmd: ScoreCmd, config: Config) -> Result<()> {
    let scorer = TokenSnifferClient::new(TokenSnifferConfig::from(&config))?;
    let score = scorer.get_score(cmd.token).await;

    println!("Token {:#x}: score {}", cmd.token, score);
    Ok(())
}

async fn status_command(config: Config) -> Result<()> {
    let chain = connect(&config, None).await?;
    let wallet = config.chain.wallet()?;

    let balance = chain
        .get_balance(wallet)
        .await
        .context("Failed to get balance")?;
    let nonce = chain
        .current_nonce(wallet)
        .await
        .context("Failed to get nonce")?;

    println!("Chain id: {}", chain.chain_id());
    println!("Wallet: {}", wallet);
    println!("Balance: {} wei ({} ETH)", balance, format_ether(balance));
    println!("Nonce: {}", nonce);

    Ok(())
}
