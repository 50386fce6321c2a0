//! Decoder types and traits
//!
//! Defines the core page decoder abstraction.

use crate::error::Result;
use crate::types::MatchedRecord;

/// Outcome of decoding one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// A record was extracted
    Record(MatchedRecord),
    /// The page had nothing the decoder recognises
    Empty,
}

/// Trait for decoding HTML pages into equipment records
pub trait PageDecoder: Send + Sync + std::fmt::Debug {
    /// Decode the page served for `id`
    fn decode(&self, id: u64, body: &str) -> Result<Decoded>;
}
