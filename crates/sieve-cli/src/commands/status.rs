//! Status command - show ledger and refiner status.

use super::{format_size, get_database, get_paths, ledger_path, load_config, runtime};
use anyhow::Result;
use colored::Colorize;
use sieve_db::Database;
use sieve_config::LlmConfig;
use sieve_llm::{OllamaClient, ProviderRegistry};

pub fn run() -> Result<()> {
    let paths = get_paths()?;
    let config = load_config(&paths)?;
    let db = get_database(&paths, &config)?;
    let path = ledger_path(&paths, &config);

    println!("{}", "Sieve Status".cyan().bold());
    println!("{}", "─".repeat(50));

    println!();
    println!("{}", "Ledger".white().bold());
    println!("  Path: {}", path.display());
    if let Ok(size) = Database::file_size(&path) {
        println!("  Size: {}", format_size(size));
    }
    println!("  Journal mode: {}", db.journal_mode()?);
    if db.integrity_check()? {
        println!("  Integrity: {}", "ok".green());
    } else {
        println!("  Integrity: {}", "FAILED (run 'PRAGMA integrity_check' for details)".red());
    }

    let counts = db.ledger_counts()?;
    println!("  {} Succeeded: {}", "●".green(), counts.success);
    if counts.failed > 0 {
        println!("  {} Failed: {} (see 'sieve failed')", "✗".red(), counts.failed);
    } else {
        println!("  {} Failed: 0", "○".dimmed());
    }
    println!("  Total: {}", counts.total());

    println!();
    println!("{}", "Refiner".white().bold());
    if config.refiner.use_llm {
        let registered = ProviderRegistry::with_defaults().contains(&config.llm.provider);
        let marker = if registered { "●".green() } else { "✗".red() };
        println!(
            "  {} LLM enhancement: {} ({})",
            marker, config.llm.provider, config.llm.model
        );
        if config.llm.provider.eq_ignore_ascii_case("ollama") {
            print_ollama_status(&config.llm)?;
        }
        println!("  Min retention ratio: {:.2}", config.refiner.min_retention_ratio);
        println!("  Max concurrency: {}", config.refiner.max_concurrency);
    } else {
        println!("  {} LLM enhancement disabled, rule-based cleaning only", "○".yellow());
    }
    println!(
        "  Chunking: {} chars, {} overlap",
        config.chunking.chunk_size, config.chunking.chunk_overlap
    );

    Ok(())
}

fn print_ollama_status(config: &LlmConfig) -> Result<()> {
    let client = OllamaClient::from_config(config)?;
    let rt = runtime()?;

    if !rt.block_on(client.is_available()) {
        println!("  {} Ollama not reachable at {} (units will fall back)", "✗".red(), client.host());
        return Ok(());
    }

    match rt.block_on(client.has_model(client.model())) {
        Ok(true) => println!("  {} Model {} available", "●".green(), client.model()),
        Ok(false) => println!(
            "  {} Model {} not pulled (run 'ollama pull {}')",
            "✗".red(),
            client.model(),
            client.model()
        ),
        Err(e) => println!("  {} Could not list models: {}", "✗".red(), e),
    }
    Ok(())
}
