//! Configuration management for Dossier databases.
//!
//! Configuration is loaded from (in priority order):
//! 1. Environment variables (DOSSIER__ prefix, `__` separator)
//! 2. Config file (dossier.toml, `[database]` section)
//! 3. Defaults

use serde::Deserialize;

use crate::error::ConfigError;

/// Path that opens a private in-memory database.
pub const IN_MEMORY_PATH: &str = ":memory:";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DossierConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// Connection settings for the SQLite store.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Database file path, or `:memory:`.
    #[serde(default = "default_path")]
    pub path: String,

    /// How long a writer waits on a locked database before giving up.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Apply pending migrations when the database is opened.
    #[serde(default = "default_true")]
    pub auto_migrate: bool,

    /// Use write-ahead logging for file databases.
    #[serde(default = "default_true")]
    pub journal_wal: bool,
}

fn default_path() -> String {
    "dossier.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_true() -> bool {
    true
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            auto_migrate: true,
            journal_wal: true,
        }
    }
}

impl DatabaseConfig {
    /// Settings for a throwaway in-memory database.
    pub fn in_memory() -> Self {
        Self {
            path: IN_MEMORY_PATH.to_string(),
            journal_wal: false,
            ..Default::default()
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.path == IN_MEMORY_PATH
    }
}

impl DossierConfig {
    /// Load configuration from `<file_prefix>.toml` (optional) and the
    /// `DOSSIER__` environment.
    pub fn load(file_prefix: &str) -> Result<Self, ConfigError> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(file_prefix).required(false))
            .add_source(
                config::Environment::with_prefix("DOSSIER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let loaded: DossierConfig = match cfg.get::<DatabaseConfig>("database") {
            Ok(database) => DossierConfig { database },
            Err(config::ConfigError::NotFound(_)) => DossierConfig::default(),
            Err(e) => return Err(e.into()),
        };

        if loaded.database.path.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "database.path".to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        tracing::debug!(path = %loaded.database.path, "Dossier configuration loaded");
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = DossierConfig::default();
        assert_eq!(config.database.path, "dossier.db");
        assert_eq!(config.database.busy_timeout_ms, 5_000);
        assert!(config.database.auto_migrate);
        assert!(!config.database.is_in_memory());
    }

    #[test]
    fn test_in_memory_config() {
        let config = DatabaseConfig::in_memory();
        assert!(config.is_in_memory());
        assert!(!config.journal_wal);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dossier.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[database]\npath = \"/var/lib/dossier/recon.db\"\nbusy_timeout_ms = 250"
        )
        .unwrap();

        let prefix = dir.path().join("dossier");
        let config = DossierConfig::load(prefix.to_str().unwrap()).unwrap();
        assert_eq!(config.database.path, "/var/lib/dossier/recon.db");
        assert_eq!(config.database.busy_timeout_ms, 250);
        assert!(config.database.auto_migrate);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("absent");
        let config = DossierConfig::load(prefix.to_str().unwrap()).unwrap();
        assert_eq!(config.database, DatabaseConfig::default());
    }
}
