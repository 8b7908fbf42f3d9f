//! Configuration Loader
//!
//! Loads and validates configuration from TOML files matching config/base.toml structure.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::Address;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use thiserror::Error;

use crate::adapters::dexscreener::{DexScreenerConfig, ListingQuery};
use crate::adapters::tokensniffer::TokenSnifferConfig;
use crate::application::{ExecutorConfig, LifecycleConfig, MonitorConfig, SettlementMode};
use crate::domain::{BasisPoints, SellSizing};

const GWEI: u128 = 1_000_000_000;

/// Main configuration structure matching config/base.toml
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub chain: ChainSection,
    #[serde(default)]
    pub trading: TradingSection,
    #[serde(default)]
    pub settlement: SettlementSection,
    #[serde(default)]
    pub monitor: MonitorSection,
    #[serde(default)]
    pub discovery: DiscoverySection,
    #[serde(default)]
    pub risk: RiskSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

/// Chain and contract addresses
#[derive(Debug, Clone, Deserialize)]
pub struct ChainSection {
    /// JSON-RPC endpoint (use a private RPC for production)
    pub rpc_url: String,
    /// Expected chain id; the node must report the same (Base mainnet = 8453)
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    /// Trading wallet; must match the key in PRIVATE_KEY
    pub wallet_address: String,
    /// Uniswap V2 style router
    pub router_address: String,
    /// WETH on Base
    #[serde(default = "default_wrapped_native")]
    pub wrapped_native_address: String,
}

impl ChainSection {
    /// Get RPC URL with environment variable override
    /// Checks BASE_RPC_URL env var first, falls back to config value
    pub fn get_rpc_url(&self) -> String {
        std::env::var("BASE_RPC_URL")
            .ok()
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| self.rpc_url.clone())
    }

    pub fn wallet(&self) -> Result<Address, ConfigError> {
        parse_address("wallet_address", &self.wallet_address)
    }

    pub fn router(&self) -> Result<Address, ConfigError> {
        parse_address("router_address", &self.router_address)
    }

    pub fn wrapped_native(&self) -> Result<Address, ConfigError> {
        parse_address("wrapped_native_address", &self.wrapped_native_address)
    }
}

/// Trade sizing and transaction parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TradingSection {
    /// Slippage tolerance as a fraction (0.2 = 20%); 1.0 disables the bound
    pub slippage: Decimal,
    /// Sell once price reaches entry × multiplier
    pub profit_multiplier: Decimal,
    /// Share of the native balance spent per buy
    pub position_fraction: Decimal,
    pub approve_gas_limit: u64,
    pub swap_gas_limit: u64,
    /// Flat gas price, not sampled from the network
    pub gas_price_gwei: u64,
    /// Swap deadline from submission
    pub deadline_secs: u64,
    pub sell_sizing: SellSizing,
}

impl Default for TradingSection {
    fn default() -> Self {
        Self {
            slippage: dec!(0.2),
            profit_multiplier: dec!(1.5),
            position_fraction: dec!(0.1),
            approve_gas_limit: 100_000,
            swap_gas_limit: 2_000_000,
            gas_price_gwei: 50,
            deadline_secs: 60,
            sell_sizing: SellSizing::PurchaseAmount,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementKind {
    /// Wait for the approval receipt
    Receipt,
    /// Sleep a fixed delay
    Delay,
}

/// How the approval is waited on before the swap
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SettlementSection {
    pub mode: SettlementKind,
    pub delay_secs: u64,
    pub receipt_timeout_secs: u64,
    pub receipt_poll_ms: u64,
}

impl Default for SettlementSection {
    fn default() -> Self {
        Self {
            mode: SettlementKind::Receipt,
            delay_secs: 30,
            receipt_timeout_secs: 120,
            receipt_poll_ms: 2_000,
        }
    }
}

impl SettlementSection {
    pub fn to_mode(&self) -> SettlementMode {
        match self.mode {
            SettlementKind::Delay => SettlementMode::FixedDelay(Duration::from_secs(self.delay_secs)),
            SettlementKind::Receipt => SettlementMode::Receipt {
                timeout: Duration::from_secs(self.receipt_timeout_secs),
                poll: Duration::from_millis(self.receipt_poll_ms),
            },
        }
    }
}

/// Price monitoring; with no stop loss and no max duration it runs until the target
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitorSection {
    pub poll_interval_secs: u64,
    /// Exit when price falls this fraction below entry
    pub stop_loss_fraction: Option<Decimal>,
    pub max_duration_secs: Option<u64>,
    /// Consecutive failed price reads tolerated
    pub price_error_tolerance: u32,
}

impl Default for MonitorSection {
    fn default() -> Self {
        Self {
            poll_interval_secs: 10,
            stop_loss_fraction: None,
            max_duration_secs: None,
            price_error_tolerance: 0,
        }
    }
}

/// DexScreener discovery and price settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiscoverySection {
    pub listing_url: String,
    pub price_api_url: String,
    pub chain: String,
    pub min_liquidity: u64,
    pub max_liquidity: u64,
    pub max_age_hours: u32,
    pub rank_by: String,
    pub order: String,
    pub social_domains: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for DiscoverySection {
    fn default() -> Self {
        let defaults = DexScreenerConfig::default();
        Self {
            listing_url: defaults.listing_url,
            price_api_url: defaults.price_api_url,
            chain: defaults.query.chain,
            min_liquidity: defaults.query.min_liquidity,
            max_liquidity: defaults.query.max_liquidity,
            max_age_hours: defaults.query.max_age_hours,
            rank_by: defaults.query.rank_by,
            order: defaults.query.order,
            social_domains: defaults.social_domains,
            timeout_secs: defaults.timeout.as_secs(),
        }
    }
}

/// TokenSniffer settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RiskSection {
    pub api_url: String,
    pub chain: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for RiskSection {
    fn default() -> Self {
        let defaults = TokenSnifferConfig::default();
        Self {
            api_url: defaults.api_url,
            chain: defaults.chain,
            api_key: None,
            timeout_secs: defaults.timeout.as_secs(),
        }
    }
}

impl RiskSection {
    /// Get API key with environment variable fallback
    /// Checks TOKENSNIFFER_API_KEY env var if config value is empty/None
    pub fn get_api_key(&self) -> Option<String> {
        if let Some(ref key) = self.api_key {
            if !key.is_empty() {
                return Some(key.clone());
            }
        }
        std::env::var("TOKENSNIFFER_API_KEY").ok().filter(|key| !key.is_empty())
    }
}

/// Logging configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

fn default_chain_id() -> u64 {
    8453
}

fn default_wrapped_native() -> String {
    "0x4200000000000000000000000000000000000006".to_string()
}

fn parse_address(field: &str, value: &str) -> Result<Address, ConfigError> {
    Address::from_str(value.trim())
        .map_err(|e| ConfigError::ValidationError(format!("{field} is not a valid address ({value}): {e}")))
}

fn fraction(field: &str, value: Decimal) -> Result<BasisPoints, ConfigError> {
    BasisPoints::from_fraction(value).map_err(|e| ConfigError::ValidationError(format!("{field}: {e}")))
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chain.rpc_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "rpc_url cannot be empty".to_string(),
            ));
        }
        self.chain.wallet()?;
        self.chain.router()?;
        self.chain.wrapped_native()?;

        let trading = &self.trading;
        fraction("slippage", trading.slippage)?;

        if trading.profit_multiplier <= Decimal::ONE {
            return Err(ConfigError::ValidationError(format!(
                "profit_multiplier must be > 1, got {}",
                trading.profit_multiplier
            )));
        }

        if trading.position_fraction <= Decimal::ZERO || trading.position_fraction > Decimal::ONE {
            return Err(ConfigError::ValidationError(format!(
                "position_fraction must be in (0, 1], got {}",
                trading.position_fraction
            )));
        }

        if trading.approve_gas_limit == 0 || trading.swap_gas_limit == 0 {
            return Err(ConfigError::ValidationError(
                "gas limits must be > 0".to_string(),
            ));
        }

        if trading.gas_price_gwei == 0 {
            return Err(ConfigError::ValidationError(
                "gas_price_gwei must be > 0".to_string(),
            ));
        }

        if trading.deadline_secs == 0 {
            return Err(ConfigError::ValidationError(
                "deadline_secs must be > 0".to_string(),
            ));
        }

        if self.settlement.mode == SettlementKind::Receipt
            && (self.settlement.receipt_timeout_secs == 0 || self.settlement.receipt_poll_ms == 0)
        {
            return Err(ConfigError::ValidationError(
                "receipt_timeout_secs and receipt_poll_ms must be > 0".to_string(),
            ));
        }

        if self.monitor.poll_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "poll_interval_secs must be > 0".to_string(),
            ));
        }

        if let Some(stop_loss) = self.monitor.stop_loss_fraction {
            if stop_loss <= Decimal::ZERO || stop_loss >= Decimal::ONE {
                return Err(ConfigError::ValidationError(format!(
                    "stop_loss_fraction must be in (0, 1), got {stop_loss}"
                )));
            }
        }

        if self.discovery.min_liquidity > self.discovery.max_liquidity {
            return Err(ConfigError::ValidationError(format!(
                "min_liquidity ({}) exceeds max_liquidity ({})",
                self.discovery.min_liquidity, self.discovery.max_liquidity
            )));
        }

        if self.discovery.social_domains.is_empty() {
            return Err(ConfigError::ValidationError(
                "social_domains cannot be empty".to_string(),
            ));
        }

        if self.discovery.listing_url.is_empty() || self.discovery.price_api_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "discovery urls cannot be empty".to_string(),
            ));
        }

        if self.risk.api_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "risk api_url cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

impl TryFrom<&Config> for ExecutorConfig {
    type Error = ConfigError;

    fn try_from(config: &Config) -> Result<Self, Self::Error> {
        Ok(ExecutorConfig {
            wallet: config.chain.wallet()?,
            router: config.chain.router()?,
            wrapped_native: config.chain.wrapped_native()?,
            approve_gas_limit: config.trading.approve_gas_limit,
            swap_gas_limit: config.trading.swap_gas_limit,
            gas_price: u128::from(config.trading.gas_price_gwei) * GWEI,
            deadline: Duration::from_secs(config.trading.deadline_secs),
            slippage: fraction("slippage", config.trading.slippage)?,
            settlement: config.settlement.to_mode(),
        })
    }
}

impl TryFrom<&Config> for LifecycleConfig {
    type Error = ConfigError;

    fn try_from(config: &Config) -> Result<Self, Self::Error> {
        Ok(LifecycleConfig {
            wallet: config.chain.wallet()?,
            position_fraction: fraction("position_fraction", config.trading.position_fraction)?,
            profit_multiplier: config.trading.profit_multiplier,
            monitor: MonitorConfig {
                poll_interval: Duration::from_secs(config.monitor.poll_interval_secs),
                stop_loss_fraction: config.monitor.stop_loss_fraction,
                max_duration: config.monitor.max_duration_secs.map(Duration::from_secs),
                price_error_tolerance: config.monitor.price_error_tolerance,
            },
            sell_sizing: config.trading.sell_sizing,
        })
    }
}

impl From<&Config> for DexScreenerConfig {
    fn from(config: &Config) -> Self {
        let discovery = &config.discovery;
        DexScreenerConfig {
            listing_url: discovery.listing_url.clone(),
            price_api_url: discovery.price_api_url.clone(),
            query: ListingQuery {
                chain: discovery.chain.clone(),
                min_liquidity: discovery.min_liquidity,
                max_liquidity: discovery.max_liquidity,
                max_age_hours: discovery.max_age_hours,
                rank_by: discovery.rank_by.clone(),
                order: discovery.order.clone(),
            },
            social_domains: discovery.social_domains.clone(),
            timeout: Duration::from_secs(discovery.timeout_secs),
        }
    }
}

impl From<&Config> for TokenSnifferConfig {
    fn from(config: &Config) -> Self {
        TokenSnifferConfig {
            api_url: config.risk.api_url.clone(),
            chain: config.risk.chain.clone(),
            api_key: config.risk.get_api_key(),
            timeout: Duration::from_secs(config.risk.timeout_secs),
        }
    }
}
