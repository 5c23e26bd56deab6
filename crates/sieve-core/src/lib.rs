//! Sieve Core - Shared value types for the Sieve ingestion pipeline.

mod error;
mod trace;
mod types;

pub use error::{Error, Result};
pub use trace::{LogSink, ObservabilitySink, StageRecord, TraceContext};
pub use types::*;
