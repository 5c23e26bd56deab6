//! Ingest command implementation.

use super::{get_database, get_paths, load_config, runtime};
use anyhow::Result;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use sieve_ingest::{detect_kind, supported_files, IngestOutcome, Ingestor};
use sieve_llm::ProviderRegistry;
use std::path::Path;
use std::time::Duration;

/// Ingest a single file or directory.
pub fn run(path: &str, collection: Option<&str>, use_llm: Option<bool>, dry_run: bool) -> Result<()> {
    let paths = get_paths()?;
    let mut config = load_config(&paths)?;
    if let Some(use_llm) = use_llm {
        config.refiner.use_llm = use_llm;
    }

    let path = Path::new(path);
    if !path.exists() {
        anyhow::bail!("Path does not exist: {}", path.display());
    }

    if dry_run {
        return dry_run_report(path);
    }

    let db = get_database(&paths, &config)?;
    let ingestor = Ingestor::from_config(db, &config, &ProviderRegistry::with_defaults())?;
    let rt = runtime()?;

    if config.refiner.use_llm && !ingestor.refiner().has_provider() {
        println!(
            "{} LLM provider unavailable, using rule-based refinement.",
            "Note:".yellow().bold()
        );
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(format!("Ingesting {}", path.display()));
    pb.enable_steady_tick(Duration::from_millis(100));

    if path.is_file() {
        let result = rt.block_on(ingestor.ingest_file(path, collection));
        pb.finish_and_clear();

        match result? {
            IngestOutcome::Skipped { fingerprint, path } => {
                println!(
                    "{} {} (unchanged, {})",
                    "Skipped:".yellow().bold(),
                    path,
                    fingerprint.short()
                );
            }
            IngestOutcome::Ingested {
                fingerprint,
                path,
                units,
                counters,
            } => {
                println!("{} {}", "Ingested:".green().bold(), path);
                println!("  Fingerprint: {}", fingerprint);
                println!(
                    "  Units: {} ({} enhanced, {} fallback)",
                    units.len(),
                    counters.enhanced_count,
                    counters.fallback_count
                );
            }
        }
    } else {
        let report = rt.block_on(ingestor.ingest_directory(path, collection));
        pb.finish_and_clear();
        let report = report?;

        println!("{} {} files", "Ingested:".green().bold(), report.ingested);
        if report.ingested > 0 {
            println!(
                "  Units: {} ({} enhanced, {} fallback)",
                report.units, report.counters.enhanced_count, report.counters.fallback_count
            );
        }
        if report.skipped > 0 {
            println!("{} {} files (unchanged)", "Skipped:".yellow().bold(), report.skipped);
        }
        if !report.failed.is_empty() {
            println!("{} {} files", "Failed:".red().bold(), report.failed.len());
            for (file, error) in &report.failed {
                println!("  {} {}", "✗".red(), file.display());
                println!("    {}", error.dimmed());
            }
        }
    }

    Ok(())
}

fn dry_run_report(path: &Path) -> Result<()> {
    if path.is_file() {
        println!("{} {}", "Would ingest:".cyan(), path.display());
        println!("  Type: {}", detect_kind(path)?);
        return Ok(());
    }

    println!("{} {}", "Scanning:".cyan(), path.display());
    let files = supported_files(path);
    for file in &files {
        let kind = detect_kind(file)?;
        println!("  {} [{}]", file.display(), kind);
    }

    println!("\nFound {} files", files.len());
    println!("{}", "Dry run - no files were ingested.".cyan());
    Ok(())
}
