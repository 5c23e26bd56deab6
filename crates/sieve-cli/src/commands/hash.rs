//! Hash command - print a file's content fingerprint.

use super::{get_database, get_paths, load_config};
use anyhow::{Context, Result};
use colored::Colorize;
use sieve_core::LedgerStatus;
use sieve_ingest::hash_file;
use std::path::Path;

pub fn run(path: &str, check: bool) -> Result<()> {
    let path = Path::new(path);
    let fingerprint =
        hash_file(path).with_context(|| format!("Failed to hash {}", path.display()))?;

    println!("{}  {}", fingerprint, path.display());

    if !check {
        return Ok(());
    }

    let paths = get_paths()?;
    let config = load_config(&paths)?;
    let db = get_database(&paths, &config)?;

    match db.get_ledger_entry(&fingerprint)? {
        None => println!("  {} not in ledger (would be ingested)", "○".yellow()),
        Some(entry) => {
            let marker = match entry.status {
                LedgerStatus::Success => "●".green(),
                LedgerStatus::Failed => "✗".red(),
            };
            println!(
                "  {} {} at {} (from {})",
                marker,
                entry.status,
                entry.last_updated_at.format("%Y-%m-%d %H:%M:%S"),
                entry.source_path
            );
            if let Some(ref error) = entry.error_message {
                println!("    {}", error.dimmed());
            }
            if entry.is_skippable() {
                println!("  Next ingest will skip this content.");
            } else {
                println!("  Next ingest will retry this content.");
            }
        }
    }

    Ok(())
}
