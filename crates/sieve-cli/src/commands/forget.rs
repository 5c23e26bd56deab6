//! Forget command - drop ledger entries so content is ingested again.

use super::{get_database, get_paths, load_config};
use anyhow::Result;
use colored::Colorize;
use sieve_core::Fingerprint;
use std::path::Path;

pub fn run(target: &str) -> Result<()> {
    let paths = get_paths()?;
    let config = load_config(&paths)?;
    let db = get_database(&paths, &config)?;

    if let Ok(fingerprint) = Fingerprint::parse(target) {
        if db.forget_ledger_entry(&fingerprint)? {
            println!("{} {}", "Forgot:".green().bold(), fingerprint);
        } else {
            println!("{} no ledger entry for {}", "Note:".yellow().bold(), fingerprint.short());
        }
        return Ok(());
    }

    let path = Path::new(target);
    let source_path = path
        .canonicalize()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|_| target.to_string());

    let removed = db.forget_by_path(&source_path)?;
    if removed == 0 {
        println!("{} no ledger entries for {}", "Note:".yellow().bold(), source_path);
    } else {
        println!("{} {} entries for {}", "Forgot:".green().bold(), removed, source_path);
    }

    Ok(())
}
