//! State types for tracking scan progress
//!
//! These types are serialized to JSON and persisted between runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Highest identifier fully processed by a scan
pub type ScanCursor = u64;

/// Complete persisted state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    /// Per-scan state, keyed by scan name
    #[serde(default)]
    pub scans: BTreeMap<String, ScanState>,
}

impl State {
    /// Create a new empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get state for a scan
    pub fn get_scan(&self, scan: &str) -> Option<&ScanState> {
        self.scans.get(scan)
    }

    /// Get mutable state for a scan, creating if needed
    pub fn get_scan_mut(&mut self, scan: &str) -> &mut ScanState {
        self.scans.entry(scan.to_string()).or_default()
    }

    /// Get the cursor for a scan
    pub fn get_cursor(&self, scan: &str) -> Option<ScanCursor> {
        self.scans.get(scan)?.last_processed_id
    }
}

/// State for a single logical scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanState {
    /// Last identifier processed
    #[serde(default)]
    pub last_processed_id: Option<ScanCursor>,

    /// Names already reported
    #[serde(default)]
    pub known_names: BTreeSet<String>,

    /// When this scan last recorded progress
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ScanState {
    /// Create a new empty scan state
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the cursor, never moving it backwards
    pub fn advance(&mut self, cursor: ScanCursor) {
        self.last_processed_id = Some(self.last_processed_id.map_or(cursor, |c| c.max(cursor)));
    }
}

/// Older state layouts, accepted on read only
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum LegacyState {
    /// `.last_id` file holding the next id to fetch
    Bare(u64),
    /// `{"last_id": N}` holding the last id fetched
    LastId { last_id: u64 },
}

impl LegacyState {
    /// Last processed id
    pub(super) fn cursor(&self) -> ScanCursor {
        match self {
            Self::Bare(next) => next.saturating_sub(1),
            Self::LastId { last_id } => *last_id,
        }
    }
}
