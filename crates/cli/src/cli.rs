//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Framelink - distributed coordinate frame transform resolver
#[derive(Parser, Debug)]
#[command(
    name = "framelink",
    author,
    version,
    about = "Distributed coordinate frame transform resolver",
    long_about = "Resolves the rigid transform between named coordinate frames over time\n\
                  and keeps that knowledge synchronized across publishing peers.\n\n\
                  The `run` command starts a self-contained demo pipeline: a publisher\n\
                  streaming a moving frame tree and a receiver resolving transforms\n\
                  against it over the in-process bus."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "FRAMELINK_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "FRAMELINK_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the demo transform pipeline
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON); defaults are used if absent
    #[arg(short, long, env = "FRAMELINK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Maximum number of lookups to perform (0 = unlimited)
    #[arg(long, default_value = "0", env = "FRAMELINK_MAX_LOOKUPS")]
    pub max_lookups: u64,

    /// Pipeline timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "FRAMELINK_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without running
    #[arg(long)]
    pub dry_run: bool,

    /// Transform publish rate in Hz
    #[arg(long, default_value = "50.0", env = "FRAMELINK_PUBLISH_RATE")]
    pub publish_rate: f64,

    /// Lookup rate in Hz
    #[arg(long, default_value = "10.0", env = "FRAMELINK_LOOKUP_RATE")]
    pub lookup_rate: f64,

    /// In-process bus channel capacity
    #[arg(long, default_value = "256", env = "FRAMELINK_BUS_CAPACITY")]
    pub bus_capacity: usize,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "FRAMELINK_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "framelink.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "framelink.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
