//! Storage layer for laytime reports.
//!
//! Persists finished reconciliation reports using `rusqlite`, keyed by
//! voyage, so past calculations remain auditable after the source documents
//! are gone.
//!
//! # Thread Safety
//!
//! The [`Store`] type wraps a `rusqlite::Connection`, which is `Send` but not
//! `Sync`. A `Store` instance can be moved between threads but cannot be
//! shared across threads without external synchronization.
//!
//! For multi-threaded access, either:
//! - Use a `Mutex<Store>` to serialize access
//! - Use separate `Store` instances per thread
//!
//! # Schema
//!
//! Timestamps are stored as TEXT in ISO 8601 format (e.g.
//! `2024-01-15T10:30:00Z`), so lexicographic ordering matches chronological
//! ordering. Report payloads are stored as the JSON serialization of
//! [`LaytimeReport`]; adding fields to the report is backward compatible,
//! removing or renaming them requires a migration.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;

use laytime_core::LaytimeReport;

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to serialize or deserialize a report payload.
    #[error("invalid report payload for {voyage}: {source}")]
    Payload {
        voyage: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A stored report row, without the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEntry {
    /// Voyage key.
    pub voyage: String,
    /// When the report was last written.
    pub saved_at: String,
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Opens a store at the given path, creating it if necessary.
    ///
    /// The schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init()?;
        Ok(store)
    }

    /// Opens an in-memory store.
    ///
    /// Useful for testing. The store is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init()?;
        Ok(store)
    }

    /// Initializes the schema.
    ///
    /// This is idempotent - safe to call on an already-initialized store.
    fn init(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS reports (
                voyage TEXT PRIMARY KEY,
                saved_at TEXT NOT NULL,
                payload TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_reports_saved ON reports(saved_at);
            ",
        )?;
        Ok(())
    }

    /// Saves a report under a voyage key, replacing any previous version.
    pub fn put_report(&mut self, voyage: &str, report: &LaytimeReport) -> Result<(), StoreError> {
        self.put_report_at(voyage, report, Utc::now())
    }

    fn put_report_at(
        &mut self,
        voyage: &str,
        report: &LaytimeReport,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let payload = serde_json::to_string(report).map_err(|source| StoreError::Payload {
            voyage: voyage.to_string(),
            source,
        })?;
        self.conn.execute(
            "
            INSERT INTO reports (voyage, saved_at, payload)
            VALUES (?, ?, ?)
            ON CONFLICT(voyage) DO UPDATE SET
                saved_at = excluded.saved_at,
                payload = excluded.payload
            ",
            params![voyage, format_timestamp(now), payload],
        )?;
        tracing::debug!(voyage, "saved laytime report");
        Ok(())
    }

    /// Loads a report by voyage key.
    pub fn get_report(&self, voyage: &str) -> Result<Option<LaytimeReport>, StoreError> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload FROM reports WHERE voyage = ?",
                params![voyage],
                |row| row.get(0),
            )
            .optional()?;
        payload
            .map(|raw| {
                serde_json::from_str(&raw).map_err(|source| StoreError::Payload {
                    voyage: voyage.to_string(),
                    source,
                })
            })
            .transpose()
    }

    /// Lists stored reports, optionally filtered by voyage key prefix,
    /// most recent first.
    pub fn list_reports(&self, prefix: Option<&str>) -> Result<Vec<ReportEntry>, StoreError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT voyage, saved_at
            FROM reports
            WHERE (?1 IS NULL OR voyage LIKE ?1 || '%')
            ORDER BY saved_at DESC, voyage ASC
            ",
        )?;
        let rows = stmt.query_map(params![prefix], |row| {
            Ok(ReportEntry {
                voyage: row.get(0)?,
                saved_at: row.get(1)?,
            })
        })?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    /// Deletes a report. Returns whether a row was removed.
    pub fn delete_report(&mut self, voyage: &str) -> Result<bool, StoreError> {
        let removed = self
            .conn
            .execute("DELETE FROM reports WHERE voyage = ?", params![voyage])?;
        Ok(removed > 0)
    }
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}
