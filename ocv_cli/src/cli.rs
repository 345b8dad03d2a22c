//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[inline]
pub fn json_mode() -> bool {
    JSON_MODE.get().copied().unwrap_or(false)
}

#[derive(Parser, Debug)]
#[command(name = "ocv", version, about = "Open-circuit voltage estimator CLI")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/ocv_config.toml")]
    pub config: PathBuf,

    /// Print estimates and errors as JSON lines instead of text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Feed a recorded CSV trace through the estimator
    Replay {
        /// CSV file with a time_ms column plus the configured sensor columns
        #[arg(long, value_name = "FILE")]
        trace: PathBuf,
        /// Model name used as the persistence identity (overrides [sensors].model)
        #[arg(long, value_name = "NAME")]
        model: Option<String>,
        /// Store directory (overrides [persistence].dir)
        #[arg(long, value_name = "DIR")]
        store: Option<PathBuf>,
        /// Print every Nth estimate (the summary is always printed)
        #[arg(long, value_name = "N", default_value_t = 1)]
        every: usize,
    },
    /// Drive a simulated pack through the estimator
    Simulate {
        /// Simulated flight length in seconds
        #[arg(long, value_name = "SECS", default_value_t = 60)]
        seconds: u64,
        /// Pace ticks with the wall clock; Ctrl-C stops cleanly
        #[arg(long, action = ArgAction::SetTrue)]
        realtime: bool,
        /// Throttle profile as "pct:ms,pct:ms,..." (repeats until the end)
        #[arg(long, value_name = "PROFILE")]
        profile: Option<String>,
        /// Tick period in milliseconds
        #[arg(long, value_name = "MS", default_value_t = 100)]
        period_ms: u64,
        /// Model name used as the persistence identity
        #[arg(long, value_name = "NAME")]
        model: Option<String>,
        /// Store directory (overrides [persistence].dir)
        #[arg(long, value_name = "DIR")]
        store: Option<PathBuf>,
        /// Print every Nth estimate (the summary is always printed)
        #[arg(long, value_name = "N", default_value_t = 10)]
        every: usize,
    },
    /// Print the stored learned record for a model
    Inspect {
        /// Model name whose record to read
        #[arg(long, value_name = "NAME")]
        model: Option<String>,
        /// Store directory (overrides [persistence].dir)
        #[arg(long, value_name = "DIR")]
        store: Option<PathBuf>,
    },
    /// Validate the config and probe the store
    SelfCheck,
}
