//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Watch a certification registry for newly listed equipment
#[derive(Parser, Debug)]
#[command(name = "certwatch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// State file (JSON), overrides the configured path
    #[arg(short, long, global = true)]
    pub state: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Probe new identifiers, persist progress and notify about matches
    Scan {
        /// Treat this id as already processed (first probe is the next id)
        #[arg(long)]
        start_id: Option<u64>,

        /// Maximum probes for this run
        #[arg(long)]
        max_probes: Option<u32>,

        /// Consecutive non-matches that end the run
        #[arg(long)]
        blank_run_limit: Option<u32>,

        /// Scan without saving state, storing records or notifying
        #[arg(long)]
        dry_run: bool,

        /// File to append `new_devices=<json>` to
        #[arg(long)]
        github_output: Option<PathBuf>,
    },

    /// Fetch and classify a single identifier
    Probe {
        /// Identifier to probe
        id: u64,
    },

    /// Inspect or change the scan cursor
    State {
        #[command(subcommand)]
        action: StateAction,
    },

    /// Manage stored equipment records
    Records {
        #[command(subcommand)]
        action: RecordsAction,
    },

    /// Send a test notification
    TestNotify,

    /// Validate the configuration and print the effective values
    Validate,
}

/// State subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum StateAction {
    /// Print the stored state of the configured scan
    Show,

    /// Set the last processed id (may rewind)
    Set {
        /// New last processed id
        id: u64,
    },

    /// Forget the cursor and seen names of the configured scan
    Reset,
}

/// Record store subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum RecordsAction {
    /// List the most recent records
    List {
        /// Maximum rows
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Category substring filter
        #[arg(long)]
        filter: Option<String>,
    },

    /// Show summary counts
    Stats,

    /// Export all records to CSV
    Export {
        /// Output file
        #[arg(default_value = "equipment_export.csv")]
        path: PathBuf,
    },

    /// Clear every notified flag
    ResetNotified,

    /// Delete one record
    Delete {
        /// Equipment id
        id: u64,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one document per line)
    Json,
    /// Pretty-printed JSON
    Pretty,
}
