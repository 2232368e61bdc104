//! Configuration loading and management

mod io;

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Main configuration structure (`~/.coursetrack/config.toml`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Backing store settings
    #[serde(default)]
    pub store: StoreSettings,

    /// Course catalog settings
    #[serde(default)]
    pub catalog: CatalogSettings,
}

/// Backing store settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSettings {
    /// SQLite database file. Defaults to `~/.coursetrack/progress.db`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,

    /// How long a single store access may wait on a locked database before
    /// the request fails with `StorageUnavailable`
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Course catalog settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogSettings {
    /// Directory of `<courseId>.json` curricula. Defaults to `~/.coursetrack/courses`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curriculum_dir: Option<PathBuf>,
}

fn default_timeout_ms() -> u64 {
    5000
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            database_path: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl StoreSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Config {
    /// Resolved database path
    pub fn database_path(&self) -> PathBuf {
        self.store
            .database_path
            .clone()
            .unwrap_or_else(|| Self::global_config_dir().join("progress.db"))
    }

    /// Resolved curriculum directory
    pub fn curriculum_dir(&self) -> PathBuf {
        self.catalog
            .curriculum_dir
            .clone()
            .unwrap_or_else(|| Self::global_config_dir().join("courses"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_file() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.store.timeout_ms, 5000);
        assert!(config.database_path().ends_with("progress.db"));
    }

    #[test]
    fn test_parse_overrides() {
        let config: Config = toml::from_str(
            r#"
            [store]
            database_path = "/var/lib/coursetrack/progress.db"
            timeout_ms = 250

            [catalog]
            curriculum_dir = "/srv/courses"
            "#,
        )
        .unwrap();
        assert_eq!(
            config.database_path(),
            PathBuf::from("/var/lib/coursetrack/progress.db")
        );
        assert_eq!(config.store.timeout(), Duration::from_millis(250));
        assert_eq!(config.curriculum_dir(), PathBuf::from("/srv/courses"));
    }
}
