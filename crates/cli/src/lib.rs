//! CLI argument parsing for the exchange core binary.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "exchange")]
#[command(about = "Exchange core - matching engine, order service, and market-data projection")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a scripted order stream through the core and print the
    /// resulting trades and order-book snapshot.
    Replay {
        /// Path to the configuration file
        #[arg(short, long, default_value = "exchange_config.yaml")]
        config: PathBuf,
    },

    /// Validate configuration without starting anything
    Validate {
        /// Path to the configuration file
        #[arg(short, long, default_value = "exchange_config.yaml")]
        config: PathBuf,
    },

    /// Write a new configuration file with all defaults
    Init {
        /// Output path for the new configuration file
        #[arg(short, long, default_value = "exchange_config.yaml")]
        output: PathBuf,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
