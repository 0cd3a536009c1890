//! CLI command definitions and subcommands

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::handler::HandlerKind;

/// gapbf - Android lock-pattern brute forcer
#[derive(Debug, Parser)]
#[command(
    name = "gapbf",
    about = "Brute-force Android lock patterns through TWRP, resumably",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Log file (default: <data dir>/gapbf/logs/gapbf.log)
    #[arg(long = "log-file", global = true)]
    pub log_file: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Try patterns until one unlocks the device or none are left
    Run {
        /// Attempt handler
        #[arg(short, long, value_enum, default_value_t = HandlerKind::Test)]
        mode: HandlerKind,

        /// Walk the patterns without touching the device or the ledger
        #[arg(long)]
        dry_run: bool,
    },

    /// Show how many patterns the configuration admits and render the first few
    Preview {
        /// Number of patterns to render
        #[arg(short = 'n', long, default_value = "10")]
        count: usize,
    },

    /// Count the patterns the configuration admits
    Count,

    /// Summarise the attempt ledger
    Status {
        /// Ledger to read (default: the configured device ledger)
        #[arg(long)]
        ledger: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

/// Output format for reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
