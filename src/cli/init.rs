//! Init command implementation

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};

use coursetrack::config::Config;

/// Default configuration content for coursetrack init
pub const DEFAULT_CONFIG: &str = r#"# coursetrack configuration
# =========================
#
# Progress, badges and certificates live in one SQLite database. Course
# curricula are read from <curriculum_dir>/<courseId>.json.

[store]
# SQLite database file (default: ~/.coursetrack/progress.db)
# database_path = "/var/lib/coursetrack/progress.db"

# How long a request may wait on a locked database, in milliseconds.
# Requests that exceed it fail as "storage unavailable" and can be retried.
timeout_ms = 5000

[catalog]
# Directory with one <courseId>.json curriculum per course
# (default: ~/.coursetrack/courses)
# curriculum_dir = "/srv/coursetrack/courses"
"#;

/// Write the default config and create the curriculum directory
pub fn init_command(config_path: Option<&Path>, force: bool) -> Result<()> {
    let config_path: PathBuf = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(Config::global_config_path);

    if config_path.exists() && !force {
        bail!(
            "Configuration already exists: {}\nUse --force to overwrite.",
            config_path.display()
        );
    }

    if let Some(parent) = config_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    std::fs::write(&config_path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    println!("Created: {}", config_path.display());

    let config = Config::from_file(&config_path)?;
    let curriculum_dir = config.curriculum_dir();
    if !curriculum_dir.exists() {
        std::fs::create_dir_all(&curriculum_dir).with_context(|| {
            format!("Failed to create {}", curriculum_dir.display())
        })?;
        println!("Created: {}", curriculum_dir.display());
    }

    Ok(())
}
