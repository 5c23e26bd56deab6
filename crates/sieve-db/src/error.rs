//! Database error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// A ledger write was rejected; the outcome for this fingerprint was not recorded.
    #[error("Failed to persist ledger entry for {fingerprint}: {message}")]
    Persistence { fingerprint: String, message: String },

    #[error("Database error: {0}")]
    Other(String),
}

impl DbError {
    /// Whether the caller may retry the ledger write alone.
    pub fn is_persistence_failure(&self) -> bool {
        matches!(self, DbError::Persistence { .. })
    }
}

pub type DbResult<T> = Result<T, DbError>;
