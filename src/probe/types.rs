//! Probe types and traits

use crate::types::MatchedRecord;
use async_trait::async_trait;
use serde::Serialize;

/// Classification of a single probed identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", content = "record", rename_all = "snake_case")]
pub enum ProbeResult {
    /// A record was extracted, whatever its category
    Match(MatchedRecord),
    /// Nothing usable at this identifier, or the fetch failed
    NoMatch,
    /// The source reported that there is no more data
    EndOfData,
}

/// Fetches and classifies the page for one identifier
///
/// Infallible by signature: implementations fold transport and decode
/// failures into [`ProbeResult::NoMatch`].
#[async_trait]
pub trait Prober: Send + Sync {
    /// Probe one identifier
    async fn probe(&self, id: u64) -> ProbeResult;
}
