//! Sieve Ingest - Fingerprinting, chunk refinement and the ingestion pipeline.
//!
//! This crate provides:
//! - Streaming SHA-256 content fingerprints
//! - Document loading (markdown, text, code) and chunking into text units
//! - Two-tier chunk refinement: LLM enhancement with rule-based fallback
//! - An ingestor that consults and updates the integrity ledger

mod chunker;
mod error;
mod hasher;
mod ingestor;
mod parsers;
pub mod refine;

pub use chunker::{ChunkConfig, Chunker};
pub use error::{HashError, IngestError, IngestResult};
pub use hasher::{hash_bytes, hash_file, HASH_BUFFER_SIZE};
pub use ingestor::{supported_files, DirectoryReport, IngestOutcome, Ingestor};
pub use parsers::{detect_kind, parse_file, DocumentParser, MarkdownParser, TextParser};
pub use refine::{ChunkRefiner, RefineBatch, RuleCleaner, REFINER_STAGE};
