//! Incremental scanner module
//!
//! Probes consecutive identifiers from a cursor until a stop condition.
//!
//! # Overview
//!
//! The scan module provides:
//! - `Scanner` - Runs the probe loop against any `Prober`
//! - `ScanConfig` - Probe budget, blank-run limit and filters
//! - `ScanOutcome` - Found records, advanced cursor and statistics
//!
//! The first identifier probed is `cursor + 1`. The scanner never reads or
//! writes state; callers persist the outcome.

mod types;

pub use types::{ScanConfig, ScanOutcome, ScanStats, StopReason, DEFAULT_TARGET_CATEGORY};

use crate::probe::{ProbeResult, Prober};
use crate::types::EndOfDataPolicy;
use std::collections::BTreeSet;
use std::time::Instant;
use tracing::{debug, info};

/// Incremental identifier scanner
#[derive(Debug, Clone, Default)]
pub struct Scanner {
    config: ScanConfig,
}

impl Scanner {
    /// Create a new scanner
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    fn blank_run_exhausted(&self, blank: u32) -> bool {
        self.config
            .blank_run_limit
            .is_some_and(|limit| blank >= limit)
    }

    /// Run one scan starting after `cursor`
    ///
    /// `known_names` is the seen set loaded from state; it is not modified.
    pub async fn scan(
        &self,
        cursor: u64,
        prober: &dyn Prober,
        known_names: &BTreeSet<String>,
    ) -> ScanOutcome {
        let start = Instant::now();
        let mut stats = ScanStats::new();
        let mut seen = known_names.clone();
        let mut found = Vec::new();
        let mut new_names = Vec::new();

        let mut cursor = cursor;
        let mut blank = 0u32;

        info!(
            "Scanning from {} (max {} probes)",
            cursor.saturating_add(1),
            self.config.max_probes
        );

        let stop_reason = loop {
            if stats.probes >= self.config.max_probes {
                break StopReason::MaxProbes;
            }
            if self.blank_run_exhausted(blank) {
                break StopReason::BlankRun;
            }
            let Some(current) = cursor.checked_add(1) else {
                break StopReason::MaxProbes;
            };

            let result = prober.probe(current).await;
            let mut end_now = false;

            match result {
                ProbeResult::Match(record) if self.config.accepts(&record) => {
                    blank = 0;
                    stats.matches += 1;
                    let key = record.key();

                    if self.config.dedup_by_name && seen.contains(&key) {
                        stats.duplicates += 1;
                        debug!("{current}: already seen '{key}'");
                    } else {
                        info!("New match {}", record.label());
                        seen.insert(key.clone());
                        new_names.push(key);
                        found.push(record);
                    }
                }
                ProbeResult::Match(record) => {
                    stats.off_target += 1;
                    debug!(
                        "{current}: off-target category {:?}",
                        record.category.as_deref().unwrap_or_default()
                    );
                    if self.config.off_target_is_blank {
                        blank += 1;
                        stats.add_blank(blank);
                    } else {
                        blank = 0;
                    }
                }
                ProbeResult::NoMatch => {
                    blank += 1;
                    stats.add_blank(blank);
                    debug!("{current}: no match (blank run {blank})");
                }
                ProbeResult::EndOfData => {
                    blank += 1;
                    stats.add_blank(blank);
                    stats.end_of_data += 1;
                    debug!("{current}: end of data (blank run {blank})");
                    end_now = self.config.end_of_data == EndOfDataPolicy::Stop;
                }
            }

            cursor = current;
            stats.add_probe();

            if end_now {
                break StopReason::EndOfData;
            }
        };

        #[allow(clippy::cast_possible_truncation)]
        stats.set_duration(start.elapsed().as_millis() as u64);

        info!(
            "Scan stopped at {cursor} ({stop_reason}): {} probes, {} new, {} duplicates, {} off-target",
            stats.probes,
            found.len(),
            stats.duplicates,
            stats.off_target
        );

        ScanOutcome {
            found,
            cursor,
            new_names,
            stats,
            stop_reason,
        }
    }
}
