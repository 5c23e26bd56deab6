//! Integrity ledger operations.
//!
//! Every operation is a single SQL statement, so each one runs in its own
//! implicit transaction. Writes are upserts keyed by fingerprint; there is no
//! read-then-write, and concurrent writers on one fingerprint resolve to
//! whichever commits last.

use crate::database::Database;
use crate::error::{DbError, DbResult};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, OptionalExtension};
use sieve_core::{Fingerprint, LedgerEntry, LedgerStatus};
use tracing::debug;

const ENTRY_COLUMNS: &str =
    "file_hash, file_path, status, collection, error_msg, processed_at, updated_at";

/// Number of ledger entries per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerCounts {
    pub success: i64,
    pub failed: i64,
}

impl LedgerCounts {
    pub fn total(&self) -> i64 {
        self.success + self.failed
    }
}

impl Database {
    /// True iff the latest entry for this fingerprint is `success`.
    pub fn should_skip(&self, fingerprint: &Fingerprint) -> DbResult<bool> {
        let conn = self.conn()?;
        let status: Option<String> = conn
            .query_row(
                "SELECT status FROM ingestion_history WHERE file_hash = ?1",
                params![fingerprint.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        Ok(matches!(
            status.as_deref().and_then(LedgerStatus::from_str),
            Some(LedgerStatus::Success)
        ))
    }

    /// Record a successful ingestion. Clears any earlier error and keeps `first_seen_at`.
    pub fn mark_success(
        &self,
        fingerprint: &Fingerprint,
        source_path: &str,
        collection: Option<&str>,
    ) -> DbResult<()> {
        self.upsert_entry(
            fingerprint,
            source_path,
            LedgerStatus::Success,
            collection,
            None,
            Utc::now(),
        )
    }

    /// Record a failed ingestion. The entry stays eligible for retry.
    pub fn mark_failed(
        &self,
        fingerprint: &Fingerprint,
        source_path: &str,
        error_message: &str,
    ) -> DbResult<()> {
        self.upsert_entry(
            fingerprint,
            source_path,
            LedgerStatus::Failed,
            None,
            Some(error_message),
            Utc::now(),
        )
    }

    fn upsert_entry(
        &self,
        fingerprint: &Fingerprint,
        source_path: &str,
        status: LedgerStatus,
        collection: Option<&str>,
        error_message: Option<&str>,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        let persistence = |message: String| DbError::Persistence {
            fingerprint: fingerprint.to_string(),
            message,
        };

        let conn = self.conn().map_err(|e| persistence(e.to_string()))?;
        let now = format_timestamp(now);

        conn.execute(
            r#"
            INSERT INTO ingestion_history (file_hash, file_path, status, collection, error_msg, processed_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            ON CONFLICT(file_hash) DO UPDATE SET
                file_path = excluded.file_path,
                status = excluded.status,
                collection = excluded.collection,
                error_msg = excluded.error_msg,
                updated_at = excluded.updated_at
            "#,
            params![
                fingerprint.as_str(),
                source_path,
                status.as_str(),
                collection,
                error_message,
                now,
            ],
        )
        .map_err(|e| persistence(e.to_string()))?;

        debug!("Ledger {} -> {} ({})", fingerprint.short(), status, source_path);
        Ok(())
    }

    /// Get the entry for a fingerprint, if any.
    pub fn get_ledger_entry(&self, fingerprint: &Fingerprint) -> DbResult<Option<LedgerEntry>> {
        let conn = self.conn()?;
        let entry = conn
            .query_row(
                &format!(
                    "SELECT {} FROM ingestion_history WHERE file_hash = ?1",
                    ENTRY_COLUMNS
                ),
                params![fingerprint.as_str()],
                row_to_entry,
            )
            .optional()?;
        Ok(entry)
    }

    /// List entries, optionally filtered by status, most recently updated first.
    pub fn list_ledger_entries(&self, status: Option<LedgerStatus>) -> DbResult<Vec<LedgerEntry>> {
        let conn = self.conn()?;

        let entries = match status {
            Some(s) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM ingestion_history WHERE status = ?1 ORDER BY updated_at DESC",
                    ENTRY_COLUMNS
                ))?;
                let rows = stmt.query_map(params![s.as_str()], row_to_entry)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM ingestion_history ORDER BY updated_at DESC",
                    ENTRY_COLUMNS
                ))?;
                let rows = stmt.query_map([], row_to_entry)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };

        Ok(entries)
    }

    /// Entries recorded for a source path (one per distinct content version).
    pub fn find_ledger_entries_by_path(&self, source_path: &str) -> DbResult<Vec<LedgerEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM ingestion_history WHERE file_path = ?1 ORDER BY updated_at DESC",
            ENTRY_COLUMNS
        ))?;
        let rows = stmt.query_map(params![source_path], row_to_entry)?;
        let entries = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Remove the entry for a fingerprint so the content is processed again.
    pub fn forget_ledger_entry(&self, fingerprint: &Fingerprint) -> DbResult<bool> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "DELETE FROM ingestion_history WHERE file_hash = ?1",
            params![fingerprint.as_str()],
        )?;
        Ok(rows > 0)
    }

    /// Remove every entry recorded for a source path.
    pub fn forget_by_path(&self, source_path: &str) -> DbResult<usize> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "DELETE FROM ingestion_history WHERE file_path = ?1",
            params![source_path],
        )?;
        Ok(rows)
    }

    /// Count entries by status.
    pub fn ledger_counts(&self) -> DbResult<LedgerCounts> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT status, COUNT(*) FROM ingestion_history GROUP BY status")?;
        let rows = stmt.query_map([], |row| {
            let status: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok((status, count))
        })?;

        let mut counts = LedgerCounts::default();
        for row in rows {
            let (status, count) = row?;
            match LedgerStatus::from_str(&status) {
                Some(LedgerStatus::Success) => counts.success = count,
                Some(LedgerStatus::Failed) => counts.failed = count,
                None => {}
            }
        }

        Ok(counts)
    }
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn row_to_entry(row: &rusqlite::Row) -> rusqlite::Result<LedgerEntry> {
    let hash: String = row.get(0)?;
    let status_str: String = row.get(2)?;
    let processed_at: String = row.get(5)?;
    let updated_at: String = row.get(6)?;

    let fingerprint = Fingerprint::parse(&hash).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(LedgerEntry {
        fingerprint,
        source_path: row.get(1)?,
        // An unreadable status must never cause a skip.
        status: LedgerStatus::from_str(&status_str).unwrap_or(LedgerStatus::Failed),
        collection: row.get(3)?,
        error_message: row.get(4)?,
        first_seen_at: parse_timestamp(&processed_at),
        last_updated_at: parse_timestamp(&updated_at),
    })
}
