//! Configuration types for a watch run
//!
//! This module contains the configuration structures loaded from YAML,
//! plus the environment overrides a CI job uses to inject secrets and the
//! starting identifier.

use crate::error::{Error, Result};
use crate::http::{HttpClientConfig, RateLimiterConfig};
use crate::scan::{ScanConfig, DEFAULT_TARGET_CATEGORY};
use crate::template::UrlTemplate;
use crate::types::{BackoffType, CategoryMatch, DecoderKind, EndOfDataPolicy, StringMap};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete watch configuration loaded from YAML
///
/// Every field has a default, so an empty document is a valid config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Where and how pages are fetched
    pub source: SourceConfig,

    /// Scan loop settings
    pub scan: ScanSection,

    /// State file settings
    pub state: StateSection,

    /// Record store settings
    pub records: RecordsSection,

    /// Notification settings
    pub notify: NotifyConfig,
}

impl WatchConfig {
    /// Parse a config from YAML text
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("Failed to read {}: {e}", path.display())))?;
        Self::from_yaml(&contents)
    }

    /// Load from an optional file, then apply process environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_from(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply environment overrides using a lookup function
    ///
    /// Empty values are ignored.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |keys: &[&str]| {
            keys.iter()
                .find_map(|key| lookup(key).filter(|v| !v.trim().is_empty()))
        };

        if let Some(token) = get(&["TELEGRAM_BOT_TOKEN", "BOT_TOKEN"]) {
            self.notify.telegram.bot_token = Some(token);
        }
        if let Some(chat_id) = get(&["TELEGRAM_CHAT_ID", "CHAT_ID"]) {
            self.notify.telegram.chat_id = Some(chat_id);
        }
        if let Some(start) = get(&["START_ID"]) {
            self.scan.seed_id = start
                .trim()
                .parse()
                .map_err(|e| Error::invalid_value("START_ID", format!("'{start}': {e}")))?;
        }
        if let Some(output) = get(&["GITHUB_OUTPUT"]) {
            self.notify.github_output = Some(PathBuf::from(output));
        }
        if let Some(state) = get(&["CERTWATCH_STATE"]) {
            self.state.path = PathBuf::from(state);
        }

        Ok(())
    }

    /// Validate all values before any probe runs
    pub fn validate(&self) -> Result<()> {
        self.url_template()?;
        self.scan_config().validate()?;

        if self.source.decoder == DecoderKind::Heading && self.scan.target_category.is_some() {
            return Err(Error::invalid_value(
                "scan.target_category",
                "the heading decoder yields no category; set it to null",
            ));
        }
        if self.scan.name.trim().is_empty() {
            return Err(Error::missing_field("scan.name"));
        }
        if self.source.timeout_secs == 0 {
            return Err(Error::invalid_value(
                "source.timeout_secs",
                "must be greater than 0",
            ));
        }
        if self.source.end_of_data_markers.iter().any(String::is_empty) {
            return Err(Error::invalid_value(
                "source.end_of_data_markers",
                "markers must not be empty",
            ));
        }
        if url::Url::parse(&self.notify.telegram.api_base).is_err() {
            return Err(Error::invalid_value(
                "notify.telegram.api_base",
                format!("'{}' is not a URL", self.notify.telegram.api_base),
            ));
        }
        Ok(())
    }

    /// The validated probe URL template
    pub fn url_template(&self) -> Result<UrlTemplate> {
        UrlTemplate::parse(self.source.url_template.clone())
    }

    /// Scanner settings
    pub fn scan_config(&self) -> ScanConfig {
        ScanConfig::new()
            .with_max_probes(self.scan.max_probes)
            .with_blank_run_limit(self.scan.blank_run_limit)
            .with_target_category(self.scan.target_category.clone())
            .with_category_match(self.scan.category_match)
            .with_end_of_data(self.scan.end_of_data)
            .with_dedup_by_name(self.scan.dedup_by_name)
            .with_off_target_is_blank(self.scan.off_target_is_blank)
    }

    /// HTTP client settings for page fetches
    pub fn http_client_config(&self) -> HttpClientConfig {
        let source = &self.source;
        let mut builder = HttpClientConfig::builder()
            .timeout(Duration::from_secs(source.timeout_secs))
            .max_retries(source.max_retries)
            .backoff(
                source.retry_backoff.backoff_type,
                Duration::from_millis(source.retry_backoff.initial_ms),
                Duration::from_millis(source.retry_backoff.max_ms),
            )
            .rate_limit(RateLimiterConfig::per_second(source.requests_per_second));

        if let Some(agent) = &source.user_agent {
            builder = builder.user_agent(agent);
        }
        for (key, value) in &source.headers {
            builder = builder.header(key, value);
        }

        builder.build()
    }
}

// ============================================================================
// Source Config
// ============================================================================

/// Where and how pages are fetched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// URL template with an `{{ id }}` placeholder
    pub url_template: String,

    /// Page layout decoder
    pub decoder: DecoderKind,

    /// Body substrings meaning "no more data"
    pub end_of_data_markers: Vec<String>,

    /// User agent override
    pub user_agent: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Maximum number of retries per probe
    pub max_retries: u32,

    /// Retry backoff configuration
    pub retry_backoff: BackoffConfig,

    /// Probe rate (0 disables the limiter)
    pub requests_per_second: u32,

    /// Extra request headers
    pub headers: StringMap,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url_template: "https://mocheck.nbtc.go.th/search-equipments/{{ id }}".to_string(),
            decoder: DecoderKind::default(),
            end_of_data_markers: vec!["Whoops, looks like something went wrong.".to_string()],
            user_agent: None,
            timeout_secs: 15,
            max_retries: 1,
            retry_backoff: BackoffConfig::default(),
            requests_per_second: 2,
            headers: StringMap::new(),
        }
    }
}

/// Backoff configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// Type of backoff
    #[serde(rename = "type")]
    pub backoff_type: BackoffType,

    /// Initial delay in milliseconds
    pub initial_ms: u64,

    /// Maximum delay in milliseconds
    pub max_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            backoff_type: BackoffType::Exponential,
            initial_ms: 500,
            max_ms: 30_000,
        }
    }
}

// ============================================================================
// Scan Config
// ============================================================================

/// Scan loop settings as written in YAML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSection {
    /// Logical scan name (state key)
    pub name: String,

    /// Cursor used when no state exists
    pub seed_id: u64,

    /// Upper bound on probes per run
    pub max_probes: u32,

    /// Consecutive non-matches that end the run (null disables)
    pub blank_run_limit: Option<u32>,

    /// Category to report (null accepts every match)
    pub target_category: Option<String>,

    /// How categories are compared
    pub category_match: CategoryMatch,

    /// What an end-of-data page does
    pub end_of_data: EndOfDataPolicy,

    /// Suppress already-seen names
    pub dedup_by_name: bool,

    /// Count off-target matches toward the blank run
    pub off_target_is_blank: bool,
}

impl Default for ScanSection {
    fn default() -> Self {
        let scan = ScanConfig::default();
        Self {
            name: crate::state::DEFAULT_SCAN.to_string(),
            seed_id: 1_628_277,
            max_probes: scan.max_probes,
            blank_run_limit: scan.blank_run_limit,
            target_category: Some(DEFAULT_TARGET_CATEGORY.to_string()),
            category_match: scan.category_match,
            end_of_data: scan.end_of_data,
            dedup_by_name: scan.dedup_by_name,
            off_target_is_blank: scan.off_target_is_blank,
        }
    }
}

// ============================================================================
// State / Records Config
// ============================================================================

/// State file settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateSection {
    /// Path to the JSON state file
    pub path: PathBuf,
}

impl Default for StateSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from("state.json"),
        }
    }
}

/// Record store settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordsSection {
    /// DuckDB file path; unset disables the store
    pub database: Option<PathBuf>,
}

// ============================================================================
// Notify Config
// ============================================================================

/// Notification settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Telegram Bot API settings
    pub telegram: TelegramConfig,

    /// `GITHUB_OUTPUT`-style file to append results to
    pub github_output: Option<PathBuf>,
}

/// Telegram Bot API settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token
    pub bot_token: Option<String>,

    /// Target chat id
    pub chat_id: Option<String>,

    /// API base URL
    pub api_base: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            chat_id: None,
            api_base: "https://api.telegram.org".to_string(),
        }
    }
}

impl TelegramConfig {
    /// Token and chat id, when both are set
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let token = self.bot_token.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let chat = self.chat_id.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        Some((token, chat))
    }
}
