//! Configuration file I/O operations

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;

use super::Config;

impl Config {
    /// Get the global config directory path (~/.coursetrack/)
    pub fn global_config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".coursetrack")
    }

    /// Get the global config file path (~/.coursetrack/config.toml)
    pub fn global_config_path() -> PathBuf {
        Self::global_config_dir().join("config.toml")
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load global configuration from ~/.coursetrack/config.toml
    /// If no config exists, auto-creates one with defaults.
    pub fn load() -> Result<Self> {
        let global_path = Self::global_config_path();
        if !global_path.exists() {
            Self::default().write_locked(&global_path, false)?;
        }
        Self::from_file(&global_path)
    }

    /// Save configuration to a file with atomic write and file locking.
    ///
    /// The exclusive lock keeps concurrent CLI invocations from interleaving
    /// writes; the temp file + rename keeps a crash from truncating the file.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        self.write_locked(path, true)
    }

    fn write_locked(&self, path: &Path, overwrite: bool) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).with_context(|| "Failed to serialize config")?;

        // Lock file is separate from the config so the rename does not drop it
        let lock_path = path.with_extension("toml.lock");
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&lock_path)
            .with_context(|| format!("Failed to create lock file: {}", lock_path.display()))?;

        lock_file
            .lock_exclusive()
            .with_context(|| "Failed to acquire config lock")?;

        // Another process may have created it while we waited
        if !overwrite && path.exists() {
            return Ok(());
        }

        let temp_path = path.with_extension("toml.tmp");
        let mut temp_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

        temp_file
            .write_all(content.as_bytes())
            .with_context(|| "Failed to write config content")?;

        temp_file
            .sync_all()
            .with_context(|| "Failed to sync config file")?;

        std::fs::rename(&temp_path, path)
            .with_context(|| format!("Failed to rename config file: {}", path.display()))?;

        tracing::debug!("Wrote config to {}", path.display());
        Ok(())
    }
}
