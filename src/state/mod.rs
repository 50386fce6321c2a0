//! State management module
//!
//! Handles the resume cursor and the set of already-reported names.
//! State is persisted between scan runs to enable incremental scans.
//!
//! # Overview
//!
//! The state module provides:
//! - `State` - Per-scan cursors and seen names
//! - `StateManager` - Fail-soft loading and atomic file persistence

mod manager;
mod types;

pub use manager::{StateManager, DEFAULT_SCAN};
pub use types::{ScanCursor, ScanState, State};

#[cfg(test)]
mod manager_tests;
