//! CLI command implementations.

pub mod config;
pub mod failed;
pub mod forget;
pub mod hash;
pub mod ingest;
pub mod init;
pub mod refine;
pub mod status;

use anyhow::{Context, Result};
use sieve_config::{AppPaths, Config};
use sieve_db::Database;
use std::path::PathBuf;
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::debug;

/// Get the application paths.
pub fn get_paths() -> Result<AppPaths> {
    AppPaths::new().context("Failed to determine application directories")
}

/// Load the config file, falling back to defaults when it does not exist.
pub fn load_config(paths: &AppPaths) -> Result<Config> {
    Config::load_from(&paths.config_file).context("Failed to load config")
}

/// Where the ledger lives for this configuration.
pub fn ledger_path(paths: &AppPaths, config: &Config) -> PathBuf {
    paths.resolve_ledger_file(config.ledger.path.as_deref(), config.general.data_dir.as_deref())
}

/// Open the ledger, ensuring sieve is initialized.
pub fn get_database(paths: &AppPaths, config: &Config) -> Result<Database> {
    if !paths.is_initialized() {
        anyhow::bail!("Sieve is not initialized. Run 'sieve init' first.");
    }

    let path = ledger_path(paths, config);
    debug!("Opening ledger at {}", path.display());
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    Database::open_with_busy_timeout(&path, Duration::from_millis(config.ledger.busy_timeout_ms))
        .with_context(|| format!("Failed to open ledger at {}", path.display()))
}

pub fn runtime() -> Result<Runtime> {
    Runtime::new().context("Failed to create async runtime")
}

/// Format a file size in human-readable form.
pub fn format_size(bytes: i64) -> String {
    const KB: i64 = 1024;
    const MB: i64 = KB * 1024;
    const GB: i64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
