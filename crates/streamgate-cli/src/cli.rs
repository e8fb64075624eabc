//! CLI command definitions using clap

use crate::output::OutputFormat;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// streamgate - simulate admission control on a resource-bound streaming server
#[derive(Parser)]
#[command(name = "streamgate")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json, table)
    #[arg(short = 'o', long, global = true)]
    pub output: Option<OutputFormat>,

    /// Configuration file path
    #[arg(short = 'c', long, global = true, env = "STREAMGATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log line format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Log line format for the tracing subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run a simulation
    Run(RunArgs),

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

/// Overrides applied on top of the loaded configuration
#[derive(Debug, Clone, Default, clap::Args)]
pub struct RunArgs {
    /// Number of clients to simulate
    #[arg(long)]
    pub clients: Option<usize>,

    /// Concurrent sessions in flight
    #[arg(long)]
    pub workers: Option<usize>,

    /// Seed for latency draws
    #[arg(long)]
    pub seed: Option<u64>,

    /// Multiplier for wall-clock sleeps (0 skips them)
    #[arg(long)]
    pub time_scale: Option<f64>,
}

/// Config subcommands
#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,

    /// Validate the configuration and print derived limits
    Validate,
}
