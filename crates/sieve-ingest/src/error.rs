//! Error types for the ingestion pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for ingestion operations.
pub type IngestResult<T> = Result<T, IngestError>;

/// Errors that can occur during ingestion.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] sieve_db::DbError),

    #[error("Config error: {0}")]
    Config(#[from] sieve_config::ConfigError),

    #[error("Hash error: {0}")]
    Hash(#[from] HashError),

    #[error("Invalid text unit: {0}")]
    InvalidUnit(#[source] sieve_core::Error),

    #[error("Invalid prompt template: {0}")]
    Prompt(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Parse error for {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Processing error: {0}")]
    ProcessingError(String),
}

/// Errors raised while fingerprinting a file.
#[derive(Error, Debug)]
pub enum HashError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    #[error("File not readable: {path}: {reason}")]
    NotReadable { path: PathBuf, reason: String },

    #[error("Read failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
