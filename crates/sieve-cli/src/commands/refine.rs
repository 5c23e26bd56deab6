//! Refine command - preview how a file's chunks would be refined.

use super::{get_paths, load_config, runtime};
use anyhow::{Context, Result};
use colored::Colorize;
use sieve_core::{RefineStrategy, TraceContext, FALLBACK_REASON_KEY};
use sieve_ingest::{parse_file, ChunkConfig, ChunkRefiner, Chunker, REFINER_STAGE};
use sieve_llm::ProviderRegistry;
use std::path::Path;

pub fn run(path: &str, use_llm: bool, json: bool) -> Result<()> {
    let paths = get_paths()?;
    let mut config = load_config(&paths)?;
    config.refiner.use_llm = use_llm;

    let path = Path::new(path);
    let document = parse_file(path).with_context(|| format!("Failed to load {}", path.display()))?;
    let units = Chunker::new(ChunkConfig::from_config(&config.chunking)).split(&document);
    if units.is_empty() {
        anyhow::bail!("{} has no text content", path.display());
    }

    let refiner = ChunkRefiner::from_config(&config, &ProviderRegistry::with_defaults())?;
    let trace = TraceContext::new();
    let (units, counters) = runtime()?.block_on(refiner.transform(units, &trace))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&units)?);
        return Ok(());
    }

    for unit in &units {
        let strategy = unit.refined_by().unwrap_or("unknown");
        let tag = if strategy == RefineStrategy::Enhanced.metadata_tag() {
            strategy.green()
        } else {
            strategy.yellow()
        };
        println!("{} [{}]", unit.id.bold(), tag);
        if let Some(reason) = unit.metadata.get(FALLBACK_REASON_KEY).and_then(|v| v.as_str()) {
            println!("  {}", reason.dimmed());
        }
        println!("{}\n", unit.text);
    }

    println!(
        "{} {} units ({} enhanced, {} fallback)",
        "Refined:".green().bold(),
        counters.total(),
        counters.enhanced_count,
        counters.fallback_count
    );
    if let Some(record) = trace.stage(REFINER_STAGE) {
        println!("  Trace: {} at {}", trace.trace_id(), record.recorded_at.format("%H:%M:%S"));
    }

    Ok(())
}
