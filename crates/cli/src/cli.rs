//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// AP-Hub Sync - clock offset estimation between an application processor and a sensor hub
#[derive(Parser, Debug)]
#[command(
    name = "aphub-sync",
    author,
    version,
    about = "AP-Hub clock synchronization pipeline",
    long_about = "Estimates the offset between the application processor clock and the \n\
                  sensor hub clock from mailbox timestamp pairs, re-stamps hub sensor \n\
                  events into the AP time domain and dispatches them to configured sinks."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "APHUB_SYNC_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "APHUB_SYNC_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the sync pipeline
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),

    /// Write the events of a synthetic session to a JSONL trace
    Record(RecordArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "config.toml",
        env = "APHUB_SYNC_CONFIG"
    )]
    pub config: PathBuf,

    /// Estimator snapshot loaded at start and written at exit
    #[arg(long, env = "APHUB_SYNC_STATE_FILE")]
    pub state_file: Option<PathBuf>,

    /// Maximum number of AP-stamped events to produce (0 = unlimited)
    #[arg(long, default_value = "0", env = "APHUB_SYNC_MAX_EVENTS")]
    pub max_events: u64,

    /// Pipeline timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "APHUB_SYNC_TIMEOUT")]
    pub timeout: u64,

    /// Pace synthetic sources in simulated time (1.0 = real time, 0 = unpaced)
    #[arg(long, default_value = "0", env = "APHUB_SYNC_PACE")]
    pub pace: f64,

    /// Validate configuration and exit without running pipeline
    #[arg(long)]
    pub dry_run: bool,

    /// Channel buffer size for internal queues
    #[arg(long, default_value = "100", env = "APHUB_SYNC_BUFFER_SIZE")]
    pub buffer_size: usize,

    /// Metrics server port, overrides the configuration file
    #[arg(long, env = "APHUB_SYNC_METRICS_PORT")]
    pub metrics_port: Option<u16>,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show sink configuration
    #[arg(long)]
    pub sinks: bool,
}

/// Arguments for the `record` command
#[derive(Parser, Debug)]
pub struct RecordArgs {
    /// Path to a configuration file with a mock source
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output trace path
    #[arg(short, long, default_value = "trace.jsonl")]
    pub output: PathBuf,

    /// Stop after this many events (0 = whole session)
    #[arg(long, default_value = "0")]
    pub limit: usize,
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
