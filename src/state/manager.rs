//! State manager implementation
//!
//! Provides file-based state persistence with atomic writes.

use super::types::{LegacyState, ScanCursor, ScanState, State};
use crate::error::{Error, Result};
use chrono::Utc;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Scan name used by [`StateManager::from_file`]
pub const DEFAULT_SCAN: &str = "nbtc";

/// Seen-name list kept next to a legacy `.last_id` file
const LEGACY_KNOWN_FILE: &str = "known.json";

/// State manager for persisting and loading state
#[derive(Debug)]
pub struct StateManager {
    /// Path to the state file
    path: PathBuf,
    /// Current state (cached)
    state: Arc<RwLock<State>>,
}

impl StateManager {
    /// Create a new state manager with the given path and empty state
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::with_state(path.as_ref().to_path_buf(), State::new())
    }

    /// Create an in-memory state manager (no file persistence)
    pub fn in_memory() -> Self {
        Self::with_state(PathBuf::new(), State::new())
    }

    fn with_state(path: PathBuf, state: State) -> Self {
        Self {
            path,
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// [`open`](Self::open) for the [`DEFAULT_SCAN`] scan
    pub fn from_file(path: impl AsRef<Path>) -> Self {
        Self::open(path, DEFAULT_SCAN)
    }

    /// Create a state manager from a file, loading existing state if present
    ///
    /// Never fails: a missing, unreadable or unparsable file starts from
    /// empty state. Legacy single-cursor files are loaded into `scan`,
    /// together with a sibling `known.json` seen list when one exists.
    pub fn open(path: impl AsRef<Path>, scan: &str) -> Self {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            debug!("No state file at {}, starting fresh", path.display());
            return Self::with_state(path, State::new());
        }

        let parsed = std::fs::read_to_string(&path)
            .map_err(|e| Error::state(format!("Cannot read state file: {e}")))
            .and_then(|contents| parse_state(&contents, scan));

        let state = match parsed {
            Ok(Parsed::Current(state)) => state,
            Ok(Parsed::Legacy(mut state)) => {
                info!(
                    "Loaded legacy cursor from {} into scan '{scan}'",
                    path.display()
                );
                if let Some(known) = load_legacy_known(&path) {
                    state.get_scan_mut(scan).known_names = known;
                }
                state
            }
            Err(e) => {
                warn!("Ignoring state file {}: {e}", path.display());
                State::new()
            }
        };

        Self::with_state(path, state)
    }

    /// Create a state manager from inline JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let state = match parse_state(json, DEFAULT_SCAN)? {
            Parsed::Current(state) | Parsed::Legacy(state) => state,
        };
        Ok(Self::with_state(PathBuf::new(), state))
    }

    /// Save current state to file
    ///
    /// Writes a sibling temp file, then renames it over the target.
    pub async fn save(&self) -> Result<()> {
        if self.is_in_memory() {
            return Ok(());
        }

        let contents = self.to_json_pretty().await?;

        let temp_path = self.path.with_extension("tmp");
        tokio::fs::write(&temp_path, &contents)
            .await
            .map_err(|e| Error::state(format!("Failed to write state file: {e}")))?;

        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| Error::state(format!("Failed to rename state file: {e}")))?;

        debug!("Saved state to {}", self.path.display());
        Ok(())
    }

    /// Export state as pretty-printed JSON string
    pub async fn to_json_pretty(&self) -> Result<String> {
        let state = self.state.read().await;
        serde_json::to_string_pretty(&*state)
            .map_err(|e| Error::state(format!("Failed to serialize state: {e}")))
    }

    /// Get the state of one scan
    pub async fn scan_state(&self, scan: &str) -> Option<ScanState> {
        self.state.read().await.get_scan(scan).cloned()
    }

    /// Stored cursor for a scan, or `seed` when none is stored
    pub async fn load_cursor(&self, scan: &str, seed: ScanCursor) -> ScanCursor {
        self.state.read().await.get_cursor(scan).unwrap_or(seed)
    }

    /// Names already reported by a scan
    pub async fn known_names(&self, scan: &str) -> BTreeSet<String> {
        self.state
            .read()
            .await
            .get_scan(scan)
            .map(|s| s.known_names.clone())
            .unwrap_or_default()
    }

    /// Merge a finished run into the in-memory state
    ///
    /// The cursor only moves forward. Call [`save`](Self::save) to persist.
    pub async fn record(&self, scan: &str, cursor: ScanCursor, new_names: &[String]) {
        let mut state = self.state.write().await;
        let entry = state.get_scan_mut(scan);
        entry.advance(cursor);
        entry.known_names.extend(new_names.iter().cloned());
        entry.updated_at = Some(Utc::now());
    }

    /// Overwrite the cursor of a scan, rewinding if needed
    pub async fn set_cursor(&self, scan: &str, cursor: ScanCursor) {
        let mut state = self.state.write().await;
        let entry = state.get_scan_mut(scan);
        entry.last_processed_id = Some(cursor);
        entry.updated_at = Some(Utc::now());
    }

    /// Forget everything about a scan
    ///
    /// Returns whether any state existed.
    pub async fn reset(&self, scan: &str) -> bool {
        self.state.write().await.scans.remove(scan).is_some()
    }

    /// Get the state file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if using in-memory mode
    pub fn is_in_memory(&self) -> bool {
        self.path.as_os_str().is_empty()
    }
}

impl Clone for StateManager {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            state: Arc::clone(&self.state),
        }
    }
}

enum Parsed {
    Current(State),
    Legacy(State),
}

fn parse_state(contents: &str, scan: &str) -> Result<Parsed> {
    if let Ok(legacy) = serde_json::from_str::<LegacyState>(contents) {
        let mut state = State::new();
        state.get_scan_mut(scan).advance(legacy.cursor());
        return Ok(Parsed::Legacy(state));
    }

    serde_json::from_str(contents)
        .map(Parsed::Current)
        .map_err(|e| Error::state(format!("Failed to parse state file: {e}")))
}

fn load_legacy_known(state_path: &Path) -> Option<BTreeSet<String>> {
    let path = state_path.with_file_name(LEGACY_KNOWN_FILE);
    let contents = std::fs::read_to_string(&path).ok()?;

    match serde_json::from_str::<BTreeSet<String>>(&contents) {
        Ok(known) => {
            info!("Imported {} known names from {}", known.len(), path.display());
            Some(known)
        }
        Err(e) => {
            warn!("Ignoring {}: {e}", path.display());
            None
        }
    }
}
