//! Initialize Sieve.

use super::{get_paths, ledger_path, load_config};
use anyhow::{Context, Result};
use colored::Colorize;
use sieve_config::Config;
use sieve_db::Database;

pub fn run() -> Result<()> {
    let paths = get_paths()?;

    // Check if already initialized
    if paths.is_initialized() {
        let config = load_config(&paths)?;
        println!("{} Sieve is already initialized.", "Note:".yellow().bold());
        println!("  Config: {}", paths.config_file.display());
        println!("  Ledger: {}", ledger_path(&paths, &config).display());
        return Ok(());
    }

    println!("{}", "Initializing Sieve...".cyan().bold());

    paths
        .ensure_dirs()
        .context("Failed to create directories")?;
    println!("  {} Created directories", "✓".green());

    Config::create_default_file(&paths.config_file).context("Failed to create config file")?;
    println!(
        "  {} Created config: {}",
        "✓".green(),
        paths.config_file.display()
    );

    let config = load_config(&paths)?;
    let ledger = ledger_path(&paths, &config);
    if let Some(parent) = ledger.parent() {
        std::fs::create_dir_all(parent).context("Failed to create ledger directory")?;
    }
    Database::open(&ledger).context("Failed to initialize ledger")?;
    println!("  {} Created ledger: {}", "✓".green(), ledger.display());

    println!();
    println!("{}", "Sieve initialized successfully!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Ingest documents: {}", "sieve ingest ~/Documents/notes".cyan());
    println!("  2. Enable LLM refinement: {}", "sieve config set refiner.use_llm true".cyan());
    println!("  3. Check status: {}", "sieve status".cyan());

    Ok(())
}
