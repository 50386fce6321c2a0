//! CLI module
//!
//! Command-line interface for the watcher.
//!
//! # Commands
//!
//! - `scan` - Probe new identifiers and report matches
//! - `probe` - Classify a single identifier
//! - `state` - Show, set or reset the scan cursor
//! - `records` - Query and maintain the record store
//! - `test-notify` - Send a test notification
//! - `validate` - Print the effective configuration

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat, RecordsAction, StateAction};
pub use runner::{Runner, ScanExit};
