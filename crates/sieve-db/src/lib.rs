//! Sieve DB - Integrity ledger storage on SQLite.

mod database;
mod error;
mod migrations;
mod operations;

pub use database::Database;
pub use error::{DbError, DbResult};
pub use operations::ledger::LedgerCounts;
