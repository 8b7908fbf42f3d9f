//! CLI Adapter
//!
//! Command-line interface for the base-sniper binary.
//! Uses clap derive macros for argument parsing.

mod commands;

pub use commands::{CliApp, Command, PriceCmd, RunCmd, ScoreCmd};
