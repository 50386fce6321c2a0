//! Record store module
//!
//! Keeps every reported equipment record in a DuckDB table so operators
//! can list, count, export and re-flag them between runs.

mod store;

pub use store::{RecordStats, RecordStore, StoredRecord};
