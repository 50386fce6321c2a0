//! Common types used throughout certwatch
//!
//! This module contains shared enums and type aliases used by the
//! configuration, scanner, and fetch layers.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// Type Aliases
// ============================================================================

/// Generic key-value map with string keys and values
pub type StringMap = HashMap<String, String>;

// ============================================================================
// Matched Record
// ============================================================================

/// Equipment record extracted from one certification page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedRecord {
    /// Identifier the page was probed at
    pub id: u64,
    /// Page URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Device name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Equipment category / type label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Certificate number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_number: Option<String>,
    /// Applicant company
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
}

impl MatchedRecord {
    /// Create an empty record for an identifier
    pub fn new(id: u64) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// Key used for name-based duplicate suppression
    ///
    /// Falls back to the model, then to the identifier, for pages without a name.
    pub fn key(&self) -> String {
        self.name
            .as_deref()
            .or(self.model.as_deref())
            .map_or_else(|| self.id.to_string(), |s| s.trim().to_string())
    }

    /// Whether no descriptive field was extracted
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.category.is_none()
            && self.brand.is_none()
            && self.model.is_none()
            && self.certificate_number.is_none()
            && self.company.is_none()
    }

    /// Short one-line label for logs
    pub fn label(&self) -> String {
        let parts: Vec<&str> = [
            self.brand.as_deref(),
            self.model.as_deref().or(self.name.as_deref()),
        ]
        .into_iter()
        .flatten()
        .collect();

        if parts.is_empty() {
            format!("#{}", self.id)
        } else {
            format!("#{} {}", self.id, parts.join(" "))
        }
    }
}

// ============================================================================
// Category Matching
// ============================================================================

/// How a record's category is compared against the target category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryMatch {
    /// Byte-for-byte equality after trimming
    #[default]
    Exact,
    /// Unicode-lowercased equality after trimming
    CaseInsensitive,
}

impl CategoryMatch {
    /// Compare a record category against the configured target
    pub fn matches(self, category: &str, target: &str) -> bool {
        let (category, target) = (category.trim(), target.trim());
        match self {
            CategoryMatch::Exact => category == target,
            CategoryMatch::CaseInsensitive => category.to_lowercase() == target.to_lowercase(),
        }
    }
}

// ============================================================================
// End-of-Data Policy
// ============================================================================

/// What the scanner does with an explicit end-of-data signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndOfDataPolicy {
    /// Treat like any other blank probe (counts toward the blank run)
    #[default]
    CountAsBlank,
    /// End the scan right after the probe that hit the marker
    Stop,
}

// ============================================================================
// Decoder Kind
// ============================================================================

/// Which page layout the decoder expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecoderKind {
    /// Search result table: Type | Brand | Model | Cert-No
    #[default]
    SummaryTable,
    /// Detail page with label/value rows
    DetailTable,
    /// Device name taken from the first Thai heading
    Heading,
}

// ============================================================================
// Backoff Type
// ============================================================================

/// Type of backoff for retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffType {
    /// Constant delay between retries
    Constant,
    /// Linear increase in delay
    Linear,
    /// Exponential increase in delay
    #[default]
    Exponential,
}

// ============================================================================
// Utilities
// ============================================================================

/// Turns blank extracted text into `None`
pub trait OptionStringExt {
    /// Trimmed value, or None when nothing but whitespace is left
    fn none_if_empty(self) -> Option<String>;
}

impl OptionStringExt for Option<String> {
    fn none_if_empty(self) -> Option<String> {
        self.and_then(OptionStringExt::none_if_empty)
    }
}

impl OptionStringExt for String {
    fn none_if_empty(self) -> Option<String> {
        let trimmed = self.trim();
        if trimmed.is_empty() {
            None
        } else if trimmed.len() == self.len() {
            Some(self)
        } else {
            Some(trimmed.to_string())
        }
    }
}
