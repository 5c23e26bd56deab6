//! Configuration commands.

use super::get_paths;
use anyhow::{Context, Result};
use colored::Colorize;
use sieve_config::Config;
use sieve_llm::ProviderRegistry;

pub fn show() -> Result<()> {
    let paths = get_paths()?;

    if !paths.config_file.exists() {
        anyhow::bail!("Config file not found. Run 'sieve init' first.");
    }

    let contents =
        std::fs::read_to_string(&paths.config_file).context("Failed to read config file")?;

    println!("{}", "Current Configuration".cyan().bold());
    println!("{}", "─".repeat(50));
    println!("{}", contents);

    Ok(())
}

pub fn set(key: &str, value: &str) -> Result<()> {
    let paths = get_paths()?;

    if !paths.config_file.exists() {
        anyhow::bail!("Config file not found. Run 'sieve init' first.");
    }

    let mut config = Config::load_from(&paths.config_file).context("Failed to load config")?;
    apply(&mut config, key, value)?;
    config.validate().context("Refusing to save an invalid configuration")?;

    config
        .save_to(&paths.config_file)
        .context("Failed to save config")?;

    let shown = if key == "llm.api_key" { "********" } else { value };
    println!("{} Set {} = {}", "✓".green(), key.cyan(), shown);

    Ok(())
}

fn optional(value: &str) -> Option<String> {
    if value.is_empty() || value.eq_ignore_ascii_case("none") {
        None
    } else {
        Some(value.to_string())
    }
}

/// Apply one `section.field = value` assignment.
fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    let parts: Vec<&str> = key.split('.').collect();

    match parts.as_slice() {
        ["general", "data_dir"] => config.general.data_dir = optional(value),
        ["ledger", "path"] => config.ledger.path = optional(value),
        ["ledger", "busy_timeout_ms"] => {
            config.ledger.busy_timeout_ms = value.parse().context("Invalid busy_timeout_ms value")?;
        }
        ["ledger", "write_retries"] => {
            config.ledger.write_retries = value.parse().context("Invalid write_retries value")?;
        }
        ["llm", "provider"] => {
            let registry = ProviderRegistry::with_defaults();
            if !registry.contains(value) {
                anyhow::bail!(
                    "Unknown provider '{}'. Available providers: {}",
                    value,
                    registry.list_providers().join(", ")
                );
            }
            config.llm.provider = value.to_lowercase();
        }
        ["llm", "host"] => config.llm.host = value.to_string(),
        ["llm", "model"] => config.llm.model = value.to_string(),
        ["llm", "api_key"] => config.llm.api_key = optional(value),
        ["llm", "timeout_seconds"] => {
            config.llm.timeout_seconds = value.parse().context("Invalid timeout value")?;
        }
        ["llm", "temperature"] => {
            config.llm.temperature = value.parse().context("Invalid temperature value")?;
        }
        ["llm", "max_tokens"] => {
            config.llm.max_tokens = value.parse().context("Invalid max_tokens value")?;
        }
        ["refiner", "use_llm"] => {
            config.refiner.use_llm = value.parse().context("Invalid boolean value")?;
        }
        ["refiner", "min_retention_ratio"] => {
            config.refiner.min_retention_ratio =
                value.parse().context("Invalid min_retention_ratio value")?;
        }
        ["refiner", "max_concurrency"] => {
            config.refiner.max_concurrency =
                value.parse().context("Invalid max_concurrency value")?;
        }
        ["refiner", "prompt_path"] => config.refiner.prompt_path = optional(value),
        ["chunking", "chunk_size"] => {
            config.chunking.chunk_size = value.parse().context("Invalid chunk_size value")?;
        }
        ["chunking", "chunk_overlap"] => {
            config.chunking.chunk_overlap = value.parse().context("Invalid chunk_overlap value")?;
        }
        ["chunking", "min_chunk_size"] => {
            config.chunking.min_chunk_size =
                value.parse().context("Invalid min_chunk_size value")?;
        }
        _ => {
            anyhow::bail!("Unknown config key: {}", key);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_known_keys() {
        let mut config = Config::default();
        apply(&mut config, "refiner.use_llm", "true").unwrap();
        apply(&mut config, "refiner.min_retention_ratio", "0.5").unwrap();
        apply(&mut config, "llm.provider", "OpenAI").unwrap();
        apply(&mut config, "ledger.path", "/tmp/ledger.db").unwrap();

        assert!(config.refiner.use_llm);
        assert_eq!(config.refiner.min_retention_ratio, 0.5);
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.ledger.path.as_deref(), Some("/tmp/ledger.db"));

        apply(&mut config, "ledger.path", "none").unwrap();
        assert!(config.ledger.path.is_none());
    }

    #[test]
    fn test_apply_rejects_bad_input() {
        let mut config = Config::default();
        assert!(apply(&mut config, "refiner.use_llm", "maybe").is_err());
        assert!(apply(&mut config, "llm.provider", "azure").is_err());
        assert!(apply(&mut config, "ui.color", "true").is_err());
    }

    #[test]
    fn test_out_of_range_ratio_fails_validation() {
        let mut config = Config::default();
        apply(&mut config, "refiner.min_retention_ratio", "1.5").unwrap();
        assert!(config.validate().is_err());
    }
}
