//! Application paths management.

use directories::ProjectDirs;
use std::path::PathBuf;

/// Manages all application paths following platform conventions.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
    pub config_file: PathBuf,
    pub ledger_file: PathBuf,
}

impl AppPaths {
    /// Create paths using platform-specific directories.
    pub fn new() -> Option<Self> {
        let proj_dirs = ProjectDirs::from("com", "sieve", "sieve")?;

        let config_dir = proj_dirs.config_dir().to_path_buf();
        let data_dir = proj_dirs.data_dir().to_path_buf();

        Some(Self {
            config_file: config_dir.join("config.toml"),
            ledger_file: data_dir.join("ingestion_history.db"),
            config_dir,
            data_dir,
        })
    }

    /// Create all necessary directories.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }

    /// Check if sieve has been initialized.
    pub fn is_initialized(&self) -> bool {
        self.config_file.exists()
    }

    /// Ledger location. An explicit `ledger.path` wins over `general.data_dir`.
    pub fn resolve_ledger_file(&self, ledger_path: Option<&str>, data_dir: Option<&str>) -> PathBuf {
        if let Some(path) = ledger_path.filter(|p| !p.trim().is_empty()) {
            return PathBuf::from(path);
        }
        match data_dir.filter(|d| !d.trim().is_empty()) {
            Some(dir) => PathBuf::from(dir).join("ingestion_history.db"),
            None => self.ledger_file.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_paths_creation() {
        let paths = AppPaths::new();
        assert!(paths.is_some());

        let paths = paths.unwrap();
        assert!(paths.config_file.to_string_lossy().contains("config.toml"));
        assert!(paths.ledger_file.to_string_lossy().contains("ingestion_history.db"));
    }

    #[test]
    fn test_resolve_ledger_override() {
        let paths = AppPaths::new().unwrap();
        assert_eq!(paths.resolve_ledger_file(None, None), paths.ledger_file);
        assert_eq!(paths.resolve_ledger_file(Some("  "), None), paths.ledger_file);
        assert_eq!(
            paths.resolve_ledger_file(None, Some("/srv/sieve")),
            PathBuf::from("/srv/sieve/ingestion_history.db")
        );
        assert_eq!(
            paths.resolve_ledger_file(Some("/tmp/ledger.db"), Some("/srv/sieve")),
            PathBuf::from("/tmp/ledger.db")
        );
    }
}
