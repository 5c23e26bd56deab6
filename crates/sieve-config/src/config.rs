//! Configuration structures and loading.

use crate::error::{ConfigError, ConfigResult};
use crate::paths::AppPaths;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub ledger: LedgerConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub refiner: RefinerConfig,

    #[serde(default)]
    pub chunking: ChunkingConfig,
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> ConfigResult<Self> {
        let paths = AppPaths::new().ok_or(ConfigError::NoConfigDir)?;
        Self::load_from(&paths.config_file)
    }

    /// Load configuration from a specific path. A missing file yields defaults.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> ConfigResult<()> {
        let paths = AppPaths::new().ok_or(ConfigError::NoConfigDir)?;
        self.save_to(&paths.config_file)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        self.validate()?;
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        let ratio = self.refiner.min_retention_ratio;
        if !(0.0..=1.0).contains(&ratio) {
            return Err(ConfigError::Invalid(format!(
                "refiner.min_retention_ratio must be between 0 and 1, got {}",
                ratio
            )));
        }
        if self.refiner.max_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "refiner.max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.llm.timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "llm.timeout_seconds must be at least 1".to_string(),
            ));
        }
        if self.chunking.chunk_size == 0 {
            return Err(ConfigError::Invalid(
                "chunking.chunk_size must be at least 1".to_string(),
            ));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(ConfigError::Invalid(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        Ok(())
    }

    /// Create a default config file with comments.
    pub fn create_default_file(path: &Path) -> ConfigResult<()> {
        let default_config = Self::default_config_string();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, default_config)?;
        Ok(())
    }

    /// Generate a default config file with helpful comments.
    pub fn default_config_string() -> String {
        r#"# Sieve Configuration

[general]
# Data directory for the ledger database
# data_dir = "~/.local/share/sieve"

[ledger]
# Ledger database file (defaults to <data_dir>/ingestion_history.db)
# path = "/var/lib/sieve/ingestion_history.db"

# How long a writer waits on a locked database before giving up (ms)
busy_timeout_ms = 5000

# Retries for a ledger write that failed after the document was processed
write_retries = 3

[llm]
# Provider key: "ollama" or "openai"
provider = "ollama"

# Server address (OpenAI-compatible providers use their base URL)
host = "http://localhost:11434"

# Model used for chunk refinement
model = "llama3.2"

# API key for hosted providers (falls back to OPENAI_API_KEY)
# api_key = ""

# Request timeout in seconds
timeout_seconds = 60

temperature = 0.3
max_tokens = 2048

[refiner]
# Use the language model to clean chunks (rule-based cleaning is always the fallback)
use_llm = false

# Reject model output shorter than this fraction of the input
min_retention_ratio = 0.3

# Concurrent model calls per batch
max_concurrency = 4

# Custom prompt template containing a {text} placeholder
# prompt_path = "~/.config/sieve/refine_prompt.txt"

[chunking]
chunk_size = 1000              # Characters per chunk
chunk_overlap = 100            # Overlap between chunks
min_chunk_size = 100
"#
        .to_string()
    }
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    pub data_dir: Option<String>,
}

/// Integrity ledger settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub path: Option<String>,
    pub busy_timeout_ms: u64,
    pub write_retries: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: 5000,
            write_retries: 3,
        }
    }
}

/// Language model provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: String,
    pub host: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            host: "http://localhost:11434".to_string(),
            model: "llama3.2".to_string(),
            api_key: None,
            timeout_seconds: 60,
            temperature: 0.3,
            max_tokens: 2048,
        }
    }
}

/// Chunk refinement settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefinerConfig {
    pub use_llm: bool,
    pub min_retention_ratio: f64,
    pub max_concurrency: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_path: Option<String>,
}

impl Default for RefinerConfig {
    fn default() -> Self {
        Self {
            use_llm: false,
            min_retention_ratio: 0.3,
            max_concurrency: 4,
            prompt_path: None,
        }
    }
}

/// Text splitting settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub min_chunk_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 100,
            min_chunk_size: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.llm.provider, "ollama");
        assert_eq!(config.llm.host, "http://localhost:11434");
        assert!(!config.refiner.use_llm);
        assert_eq!(config.ledger.write_retries, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();

        assert_eq!(config.llm.model, deserialized.llm.model);
        assert_eq!(
            config.refiner.min_retention_ratio,
            deserialized.refiner.min_retention_ratio
        );
    }

    #[test]
    fn test_default_config_string_parses() {
        let config: Config = toml::from_str(&Config::default_config_string()).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.chunking.chunk_size, 1000);
    }

    #[test]
    fn test_load_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
            [llm]
            provider = "openai"
            model = "gpt-4o-mini"

            [refiner]
            use_llm = true
            "#
        )
        .unwrap();

        let config = Config::load_from(temp_file.path()).unwrap();

        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert!(config.refiner.use_llm);
        // Defaults should still work
        assert_eq!(config.refiner.max_concurrency, 4);
        assert_eq!(config.llm.timeout_seconds, 60);
    }

    #[test]
    fn test_invalid_ratio_rejected() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[refiner]\nmin_retention_ratio = 1.5").unwrap();

        let err = Config::load_from(temp_file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_overlap_must_be_smaller_than_size() {
        let mut config = Config::default();
        config.chunking.chunk_overlap = config.chunking.chunk_size;
        assert!(config.validate().is_err());
    }
}
