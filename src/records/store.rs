//! DuckDB-backed record store

use crate::error::{Error, Result};
use crate::types::{CategoryMatch, MatchedRecord};
use chrono::{DateTime, Duration, Utc};
use duckdb::{params, Connection, Row};
use serde::Serialize;
use std::path::Path;
use tracing::debug;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS equipment (
    equipment_id UBIGINT PRIMARY KEY,
    name VARCHAR,
    category VARCHAR,
    brand VARCHAR,
    model VARCHAR,
    certificate_number VARCHAR,
    company VARCHAR,
    url VARCHAR,
    first_seen TIMESTAMP NOT NULL,
    notified BOOLEAN NOT NULL DEFAULT false
);";

const COLUMNS: &str = "equipment_id, name, category, brand, model, certificate_number, \
                       company, url, strftime(first_seen, '%Y-%m-%d %H:%M:%S') AS first_seen, notified";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A record as stored, with bookkeeping columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredRecord {
    /// The equipment record
    #[serde(flatten)]
    pub record: MatchedRecord,
    /// When the record was first stored (UTC, `YYYY-MM-DD HH:MM:SS`)
    pub first_seen: String,
    /// Whether a notification was sent
    pub notified: bool,
}

/// Summary counts over the store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecordStats {
    /// All stored records
    pub total: u64,
    /// Records in the target category
    pub target_category: u64,
    /// Records already notified
    pub notified: u64,
    /// Records first seen in the last 24 hours
    pub last_24h: u64,
    /// Records first seen in the last 7 days
    pub last_7d: u64,
}

/// Store of every reported equipment record
pub struct RecordStore {
    conn: Connection,
}

impl RecordStore {
    /// Open (or create) a store at a file path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| {
            Error::records(format!("Failed to open {}: {e}", path.display()))
        })?;
        Self::init(conn)
    }

    /// Create a throwaway in-memory store
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::records(format!("Failed to create DuckDB connection: {e}")))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Insert records, skipping identifiers already stored
    ///
    /// Returns the records that were actually inserted.
    pub fn insert_new(&self, records: &[MatchedRecord]) -> Result<Vec<MatchedRecord>> {
        self.insert_at(records, Utc::now())
    }

    pub(super) fn insert_at(
        &self,
        records: &[MatchedRecord],
        seen_at: DateTime<Utc>,
    ) -> Result<Vec<MatchedRecord>> {
        let seen_at = seen_at.format(TIMESTAMP_FORMAT).to_string();
        let mut stmt = self.conn.prepare(
            "INSERT INTO equipment
                (equipment_id, name, category, brand, model, certificate_number,
                 company, url, first_seen)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, CAST(? AS TIMESTAMP))
             ON CONFLICT DO NOTHING",
        )?;

        let mut inserted = Vec::new();
        for record in records {
            let changed = stmt.execute(params![
                record.id,
                record.name,
                record.category,
                record.brand,
                record.model,
                record.certificate_number,
                record.company,
                record.url,
                seen_at,
            ])?;
            if changed > 0 {
                inserted.push(record.clone());
            } else {
                debug!("Record {} already stored", record.id);
            }
        }

        Ok(inserted)
    }

    /// Flag records as notified
    pub fn mark_notified(&self, ids: &[u64]) -> Result<usize> {
        let mut stmt = self
            .conn
            .prepare("UPDATE equipment SET notified = true WHERE equipment_id = ?")?;

        let mut updated = 0;
        for id in ids {
            updated += stmt.execute(params![id])?;
        }
        Ok(updated)
    }

    /// Most recent records first, optionally filtered by category substring
    pub fn list(&self, limit: usize, category_filter: Option<&str>) -> Result<Vec<StoredRecord>> {
        let pattern = category_filter.map_or_else(|| "%".to_string(), |f| format!("%{f}%"));
        let sql = format!(
            "SELECT {COLUMNS} FROM equipment
             WHERE coalesce(category, '') ILIKE ?
             ORDER BY first_seen DESC, equipment_id DESC
             LIMIT {limit}"
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![pattern], read_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Look up one record
    pub fn get(&self, id: u64) -> Result<Option<StoredRecord>> {
        let sql = format!("SELECT {COLUMNS} FROM equipment WHERE equipment_id = ?");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query_map(params![id], read_row)?;
        Ok(rows.next().transpose()?)
    }

    /// Summary counts, with categories compared the way the scanner does
    pub fn stats(&self, target_category: &str, mode: CategoryMatch) -> Result<RecordStats> {
        self.stats_at(target_category, mode, Utc::now())
    }

    pub(super) fn stats_at(
        &self,
        target_category: &str,
        mode: CategoryMatch,
        now: DateTime<Utc>,
    ) -> Result<RecordStats> {
        let category_filter = match mode {
            CategoryMatch::Exact => "trim(category) = trim(?)",
            CategoryMatch::CaseInsensitive => "lower(trim(category)) = lower(trim(?))",
        };
        let day = (now - Duration::days(1)).format(TIMESTAMP_FORMAT).to_string();
        let week = (now - Duration::days(7)).format(TIMESTAMP_FORMAT).to_string();

        let stats = self.conn.query_row(
            &format!(
                "SELECT
                    count(*),
                    count(*) FILTER (WHERE {category_filter}),
                    count(*) FILTER (WHERE notified),
                    count(*) FILTER (WHERE first_seen >= CAST(? AS TIMESTAMP)),
                    count(*) FILTER (WHERE first_seen >= CAST(? AS TIMESTAMP))
                 FROM equipment"
            ),
            params![target_category, day, week],
            |row| {
                Ok(RecordStats {
                    total: row.get(0)?,
                    target_category: row.get(1)?,
                    notified: row.get(2)?,
                    last_24h: row.get(3)?,
                    last_7d: row.get(4)?,
                })
            },
        )?;

        Ok(stats)
    }

    /// Write every record to a CSV file with a header row
    pub fn export_csv(&self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let target = path
            .to_str()
            .ok_or_else(|| Error::records(format!("Invalid export path: {}", path.display())))?
            .replace('\'', "''");

        let count: u64 = self
            .conn
            .query_row("SELECT count(*) FROM equipment", [], |row| row.get(0))?;

        self.conn.execute_batch(&format!(
            "COPY (SELECT {COLUMNS} FROM equipment ORDER BY equipment_id)
             TO '{target}' (HEADER, DELIMITER ',');"
        ))?;

        debug!("Exported {count} records to {}", path.display());
        Ok(usize::try_from(count).unwrap_or(usize::MAX))
    }

    /// Clear the notified flag everywhere
    pub fn reset_notified(&self) -> Result<usize> {
        Ok(self
            .conn
            .execute("UPDATE equipment SET notified = false WHERE notified", [])?)
    }

    /// Delete one record; returns whether it existed
    pub fn delete(&self, id: u64) -> Result<bool> {
        Ok(self
            .conn
            .execute("DELETE FROM equipment WHERE equipment_id = ?", params![id])?
            > 0)
    }
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore").finish_non_exhaustive()
    }
}

fn read_row(row: &Row<'_>) -> duckdb::Result<StoredRecord> {
    Ok(StoredRecord {
        record: MatchedRecord {
            id: row.get(0)?,
            name: row.get(1)?,
            category: row.get(2)?,
            brand: row.get(3)?,
            model: row.get(4)?,
            certificate_number: row.get(5)?,
            company: row.get(6)?,
            url: row.get(7)?,
        },
        first_seen: row.get(8)?,
        notified: row.get(9)?,
    })
}
