// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # certwatch
//!
//! Incremental watcher for a certification registry that publishes one
//! detail page per sequentially numbered equipment record.
//!
//! Each run resumes after the last processed identifier, probes forward
//! until a bound is hit, reports newly listed records of the target
//! category and persists the new cursor.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use certwatch::{HttpProber, ScanConfig, Scanner, StateManager, WatchConfig};
//!
//! #[tokio::main]
//! async fn main() -> certwatch::Result<()> {
//!     let config = WatchConfig::load(None)?;
//!     let state = StateManager::from_file(&config.state.path);
//!
//!     let cursor = state.load_cursor("nbtc", config.scan.seed_id).await;
//!     let known = state.known_names("nbtc").await;
//!
//!     let prober = /* HttpProber::new(template, client, decoder) */;
//!     let outcome = Scanner::new(config.scan_config())
//!         .scan(cursor, &prober, &known)
//!         .await;
//!
//!     state.record("nbtc", outcome.cursor, &outcome.new_names).await;
//!     state.save().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                            Scanner                              │
//! │  scan(cursor, prober, known) → ScanOutcome {found, cursor, ...} │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────┬───────────┬───────┴───────┬───────────┬─────────────┐
//! │  Probe   │   HTTP    │    Decode     │   State   │   Notify    │
//! ├──────────┼───────────┼───────────────┼───────────┼─────────────┤
//! │ Template │ GET/POST  │ Summary table │ JSON file │ Telegram    │
//! │ Classify │ Retry     │ Detail table  │ Atomic    │ CI output   │
//! │ End mark │ Rate Limit│ Heading       │ Legacy    │ Records     │
//! └──────────┴───────────┴───────────────┴───────────┴─────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// HTTP client with retry and rate limiting
pub mod http;

/// URL templates with an `{{ id }}` placeholder
pub mod template;

/// Page decoders (HTML to record)
pub mod decode;

/// Single-identifier probing
pub mod probe;

/// Bounded forward scan
pub mod scan;

/// Persistent scan cursor
pub mod state;

/// Record store via DuckDB
pub mod records;

/// Notifications and CI output
pub mod notify;

/// Configuration file and environment
pub mod config;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use config::WatchConfig;
pub use notify::Notifier;
pub use probe::{HttpProber, ProbeResult, Prober};
pub use records::RecordStore;
pub use scan::{ScanConfig, ScanOutcome, Scanner};
pub use state::StateManager;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
