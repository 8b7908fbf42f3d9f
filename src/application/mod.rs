//! Application Layer - Trade lifecycle use cases
//!
//! - `executor`: approve + swap transaction pairs against the router
//! - `monitor`: price polling until an exit condition fires
//! - `controller`: discover → filter → size → buy → monitor → sell

pub mod controller;
pub mod error;
pub mod executor;
pub mod monitor;

pub use controller::{CandidateFailure, LifecycleConfig, RunReport, TradeLifecycleController, TradeOutcome};
pub use error::{TradeDirection, TradeError, TradeStep};
pub use executor::{ExecutorConfig, SettlementMode, TradeExecutor};
pub use monitor::{MonitorConfig, MonitorExit, PriceMonitor, StopHandle};
