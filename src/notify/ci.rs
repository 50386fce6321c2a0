//! CI step output writer

use crate::error::{Error, Result};
use crate::types::MatchedRecord;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Appends `new_devices=<json>` to a `GITHUB_OUTPUT`-style file
#[derive(Debug, Clone)]
pub struct CiOutput {
    path: PathBuf,
}

impl CiOutput {
    /// Create a writer for a file path
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Append the found records as one `key=value` line
    pub fn write(&self, records: &[MatchedRecord]) -> Result<()> {
        let json = serde_json::to_string(records)?;

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                Error::notify(format!("Cannot open {}: {e}", self.path.display()))
            })?;
        writeln!(file, "new_devices={json}")?;
        Ok(())
    }
}
