//! Scanner types
//!
//! Configuration, outcome and statistics for an incremental scan.

use crate::error::{Error, Result};
use crate::types::{CategoryMatch, EndOfDataPolicy, MatchedRecord};
use serde::Serialize;

/// Default target equipment category
pub const DEFAULT_TARGET_CATEGORY: &str = "Cellular Mobile (GSM/WCDMA/LTE/NR)";

/// Configuration for a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Upper bound on probes per run (must be > 0)
    pub max_probes: u32,
    /// Consecutive non-matches that end the run (`None` disables)
    pub blank_run_limit: Option<u32>,
    /// Category a match must carry to be reported (`None` accepts all)
    pub target_category: Option<String>,
    /// How categories are compared
    pub category_match: CategoryMatch,
    /// What an end-of-data signal does
    pub end_of_data: EndOfDataPolicy,
    /// Suppress matches whose name was already reported
    pub dedup_by_name: bool,
    /// Count off-target matches toward the blank run
    pub off_target_is_blank: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_probes: 500,
            blank_run_limit: Some(500),
            target_category: Some(DEFAULT_TARGET_CATEGORY.to_string()),
            category_match: CategoryMatch::default(),
            end_of_data: EndOfDataPolicy::default(),
            dedup_by_name: true,
            off_target_is_blank: false,
        }
    }
}

impl ScanConfig {
    /// Create a new scan config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set max probes
    #[must_use]
    pub fn with_max_probes(mut self, max: u32) -> Self {
        self.max_probes = max;
        self
    }

    /// Set the blank run limit
    #[must_use]
    pub fn with_blank_run_limit(mut self, limit: Option<u32>) -> Self {
        self.blank_run_limit = limit;
        self
    }

    /// Set the target category
    #[must_use]
    pub fn with_target_category(mut self, category: Option<String>) -> Self {
        self.target_category = category;
        self
    }

    /// Set the category comparison mode
    #[must_use]
    pub fn with_category_match(mut self, mode: CategoryMatch) -> Self {
        self.category_match = mode;
        self
    }

    /// Set the end-of-data policy
    #[must_use]
    pub fn with_end_of_data(mut self, policy: EndOfDataPolicy) -> Self {
        self.end_of_data = policy;
        self
    }

    /// Enable or disable name dedup
    #[must_use]
    pub fn with_dedup_by_name(mut self, dedup: bool) -> Self {
        self.dedup_by_name = dedup;
        self
    }

    /// Count off-target matches as blanks
    #[must_use]
    pub fn with_off_target_is_blank(mut self, blank: bool) -> Self {
        self.off_target_is_blank = blank;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_probes == 0 {
            return Err(Error::invalid_value(
                "scan.max_probes",
                "must be greater than 0",
            ));
        }
        if self.blank_run_limit == Some(0) {
            return Err(Error::invalid_value(
                "scan.blank_run_limit",
                "must be greater than 0 (use null to disable)",
            ));
        }
        Ok(())
    }

    /// Whether a record's category is the one being watched
    pub fn accepts(&self, record: &MatchedRecord) -> bool {
        match &self.target_category {
            None => true,
            Some(target) => record
                .category
                .as_deref()
                .is_some_and(|category| self.category_match.matches(category, target)),
        }
    }
}

/// Why the scan loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The probe budget was used up
    MaxProbes,
    /// Too many consecutive non-matches
    BlankRun,
    /// The source reported end of data (`Stop` policy)
    EndOfData,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MaxProbes => write!(f, "max probes reached"),
            Self::BlankRun => write!(f, "blank run limit reached"),
            Self::EndOfData => write!(f, "end of data"),
        }
    }
}

/// Statistics from a scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    /// Identifiers probed
    pub probes: u32,
    /// Matches in the target category (reported or duplicate)
    pub matches: u32,
    /// Matches in another category
    pub off_target: u32,
    /// Target matches suppressed as already seen
    pub duplicates: u32,
    /// Probes that counted toward the blank run
    pub blanks: u32,
    /// End-of-data signals received
    pub end_of_data: u32,
    /// Longest run of consecutive blanks
    pub longest_blank_run: u32,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl ScanStats {
    /// Create new stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one probe
    pub fn add_probe(&mut self) {
        self.probes += 1;
    }

    /// Record a blank and track the current run length
    pub fn add_blank(&mut self, run: u32) {
        self.blanks += 1;
        self.longest_blank_run = self.longest_blank_run.max(run);
    }

    /// Set duration
    pub fn set_duration(&mut self, ms: u64) {
        self.duration_ms = ms;
    }
}

/// Result of one scan run
///
/// Nothing here has been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanOutcome {
    /// Newly found records in probe order
    pub found: Vec<MatchedRecord>,
    /// Last identifier probed (the starting cursor if nothing was probed)
    pub cursor: u64,
    /// Dedup keys of `found`, to merge into the seen set
    pub new_names: Vec<String>,
    /// Run statistics
    pub stats: ScanStats,
    /// Why the run ended
    pub stop_reason: StopReason,
}

impl ScanOutcome {
    /// Whether anything new was found
    pub fn has_news(&self) -> bool {
        !self.found.is_empty()
    }
}
