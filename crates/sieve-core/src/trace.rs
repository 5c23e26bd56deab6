//! Observability sinks for per-stage refinement counters.

use crate::types::RefineCounters;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Mutex;
use tracing::info;

/// Receives per-batch counters keyed by a stage name.
pub trait ObservabilitySink: Send + Sync {
    fn record_stage(&self, stage: &str, counters: &RefineCounters);
}

/// A single recorded stage.
#[derive(Debug, Clone, Serialize)]
pub struct StageRecord {
    pub stage: String,
    pub counters: RefineCounters,
    pub recorded_at: DateTime<Utc>,
}

/// In-memory sink that keeps every recorded stage for later inspection.
#[derive(Debug)]
pub struct TraceContext {
    trace_id: String,
    stages: Mutex<Vec<StageRecord>>,
}

impl TraceContext {
    pub fn new() -> Self {
        Self {
            trace_id: crate::types::new_id(),
            stages: Mutex::new(Vec::new()),
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// Latest record for a stage, if one was reported.
    pub fn stage(&self, stage: &str) -> Option<StageRecord> {
        let stages = self.stages.lock().unwrap_or_else(|e| e.into_inner());
        stages.iter().rev().find(|r| r.stage == stage).cloned()
    }

    /// All records in the order they were reported.
    pub fn stages(&self) -> Vec<StageRecord> {
        self.stages.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Default for TraceContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ObservabilitySink for TraceContext {
    fn record_stage(&self, stage: &str, counters: &RefineCounters) {
        let record = StageRecord {
            stage: stage.to_string(),
            counters: *counters,
            recorded_at: Utc::now(),
        };
        self.stages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record);
    }
}

/// Sink that emits counters as structured log events.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ObservabilitySink for LogSink {
    fn record_stage(&self, stage: &str, counters: &RefineCounters) {
        info!(
            stage,
            enhanced_count = counters.enhanced_count,
            fallback_count = counters.fallback_count,
            "stage completed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_context_keeps_latest_stage() {
        let trace = TraceContext::new();
        assert!(trace.stage("chunk_refiner").is_none());

        trace.record_stage(
            "chunk_refiner",
            &RefineCounters { enhanced_count: 1, fallback_count: 0 },
        );
        trace.record_stage(
            "chunk_refiner",
            &RefineCounters { enhanced_count: 2, fallback_count: 3 },
        );

        let record = trace.stage("chunk_refiner").unwrap();
        assert_eq!(record.counters.enhanced_count, 2);
        assert_eq!(record.counters.fallback_count, 3);
        assert_eq!(trace.stages().len(), 2);
        assert!(!trace.trace_id().is_empty());
    }
}
