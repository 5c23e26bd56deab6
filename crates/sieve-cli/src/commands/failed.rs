//! Failed command - list content whose last ingestion attempt failed.

use super::{get_database, get_paths, load_config};
use anyhow::Result;
use chrono::Local;
use colored::Colorize;
use sieve_core::LedgerStatus;

pub fn run(limit: usize) -> Result<()> {
    let paths = get_paths()?;
    let config = load_config(&paths)?;
    let db = get_database(&paths, &config)?;

    let entries = db.list_ledger_entries(Some(LedgerStatus::Failed))?;
    if entries.is_empty() {
        println!("{}", "No failed ingestions.".green());
        return Ok(());
    }

    println!("{} ({} total)\n", "Failed Ingestions".red().bold(), entries.len());
    for entry in entries.iter().take(limit) {
        let when = entry.last_updated_at.with_timezone(&Local);
        println!(
            "{} {}  {}",
            "✗".red(),
            entry.fingerprint.short(),
            entry.source_path
        );
        println!("    Last attempt: {}", when.format("%Y-%m-%d %H:%M"));
        if let Some(ref error) = entry.error_message {
            println!("    {}", error.dimmed());
        }
    }

    if entries.len() > limit {
        println!("\n... and {} more (use --limit to show more)", entries.len() - limit);
    }
    println!("\nRetry with 'sieve ingest <path>'; failed content is never skipped.");

    Ok(())
}
