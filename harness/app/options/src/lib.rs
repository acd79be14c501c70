// Copyright 2022-2024 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use lazy_static::lazy_static;
use tracing_subscriber::EnvFilter;

use self::{deploy::DeployArgs, selectors::SelectorsArgs};

pub mod deploy;
pub mod selectors;

mod log;

use log::{parse_log_level, LogLevel};

lazy_static! {
    static ref ENV_ALIASES: Vec<(&'static str, Vec<&'static str>)> = vec![
        ("TREX_RPC_URL", vec!["RPC_URL"]),
        ("TREX_API_URL", vec!["API_URL"]),
        ("TREX_PRIVATE_KEY", vec!["PRIVATE_KEY"]),
        (
            "TREX_WALLETCONNECT_PROJECT_ID",
            vec!["WALLETCONNECT_PROJECT_ID"]
        ),
        ("TREX_GAS_PRICE_GWEI", vec!["GAS_PRICE_GWEI"]),
        ("TREX_MAX_FEE_GWEI", vec!["MAX_FEE_GWEI"]),
        ("TREX_MAX_PRIORITY_FEE_GWEI", vec!["MAX_PRIORITY_FEE_GWEI"]),
        ("TREX_CONFIRMATIONS", vec!["CONFIRMATIONS"]),
        ("TREX_LOG_LEVEL", vec!["LOG_LEVEL", "RUST_LOG"])
    ];
}

/// Parse the main arguments by:
/// 0. Detecting aliased env vars
/// 1. Parsing and returning the final [Options]
pub fn parse() -> Options {
    set_env_from_aliases();
    let opts: Options = Options::parse();
    opts
}

/// Assign value to env vars from aliases, if the canonic key doesn't exist but the alias does.
fn set_env_from_aliases() {
    'keys: for (key, aliases) in ENV_ALIASES.iter() {
        for alias in aliases {
            if let (Err(_), Ok(value)) = (std::env::var(key), std::env::var(alias)) {
                std::env::set_var(key, value);
                continue 'keys;
            }
        }
    }
}

#[derive(Parser, Debug)]
#[command(version)]
pub struct Options {
    /// Path to the combined contract build output.
    #[arg(
        long,
        default_value = "metadata/combined.json",
        env = "TREX_ARTIFACTS_FILE"
    )]
    pub artifacts_file: PathBuf,

    /// Set a custom directory for log files.
    #[arg(long, env = "TREX_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Set a custom prefix for log files.
    #[arg(long, env = "TREX_LOG_FILE_PREFIX")]
    pub log_file_prefix: Option<String>,

    /// Set the logging level of the console.
    #[arg(
        short = 'l',
        long,
        default_value = "info",
        value_enum,
        env = "TREX_LOG_LEVEL",
        help = "Standard log levels, or a comma separated list of filters, e.g. 'debug,ethers_providers=warn,hyper=info'",
        value_parser = parse_log_level,
    )]
    log_level: LogLevel,

    /// Set the logging level of the log file. If missing, it defaults to the same level as the console.
    #[arg(
        long,
        value_enum,
        env = "TREX_LOG_FILE_LEVEL",
        value_parser = parse_log_level,
    )]
    log_file_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Options {
    /// Tracing filter for the console.
    ///
    /// Coalescing everything into a filter instead of either a level or a filter
    /// because the `tracing_subscriber` setup methods like `with_filter` and `with_level`
    /// produce different static types and it's not obvious how to use them as alternatives.
    pub fn log_console_filter(&self) -> anyhow::Result<EnvFilter> {
        self.log_level.to_filter()
    }

    /// Tracing filter for the log file.
    pub fn log_file_filter(&self) -> anyhow::Result<EnvFilter> {
        if let Some(ref level) = self.log_file_level {
            level.to_filter()
        } else {
            self.log_console_filter()
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Deploy the diamond with its facets and wire up the routing.
    Deploy(DeployArgs),
    /// Print the function selectors of a contract artifact.
    Selectors(SelectorsArgs),
}
