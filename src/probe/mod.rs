//! Fetch and classify module
//!
//! # Overview
//!
//! The probe module provides:
//! - `Prober` - Trait the scanner drives, one identifier at a time
//! - `ProbeResult` - Match / NoMatch / EndOfData classification
//! - `HttpProber` - Prober backed by the HTTP client and a page decoder

mod prober;
mod types;

pub use prober::HttpProber;
pub use types::{ProbeResult, Prober};
