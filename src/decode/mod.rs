//! Page decoder module
//!
//! Supports: search result table, label/value detail table, Thai heading
//!
//! # Overview
//!
//! The decode module turns the HTML of one certification page into a
//! `MatchedRecord`, or reports that the page holds nothing recognisable.
//! Deciding whether the record is on target is left to the scanner.

mod decoders;
mod types;

pub use decoders::{build_decoder, DetailTableDecoder, HeadingDecoder, SummaryTableDecoder};
pub use types::{Decoded, PageDecoder};
