//! CLI command implementations

pub mod badge;
pub mod certificate;
pub mod init;
pub mod progress;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use coursetrack::config::Config;
use coursetrack::curriculum::DirectoryCatalog;
use coursetrack::store::{ProgressDb, SqliteIdentityDirectory};
use coursetrack::{Certificate, ProgressEngine};

/// Everything a command needs: loaded config, an open engine, output mode
pub struct Context {
    pub config: Config,
    pub engine: ProgressEngine,
    pub identity: SqliteIdentityDirectory,
    pub json: bool,
}

impl Context {
    /// Load config (explicit path or the global one) and open the store
    pub fn load(config_path: Option<&Path>, json: bool) -> Result<Self> {
        let config = match config_path {
            Some(path) => Config::from_file(path)?,
            None => Config::load()?,
        };

        let db = ProgressDb::open_with_config(&config).with_context(|| {
            format!("Failed to open database: {}", config.database_path().display())
        })?;
        let identity = SqliteIdentityDirectory::new(db.clone());
        let engine = ProgressEngine::new(
            db,
            Arc::new(DirectoryCatalog::new(config.curriculum_dir())),
            Arc::new(identity.clone()),
        );

        Ok(Self {
            config,
            engine,
            identity,
            json,
        })
    }

    /// Print `value` as pretty JSON; returns false when in text mode
    pub fn print_json<T: Serialize>(&self, value: &T) -> Result<bool> {
        if !self.json {
            return Ok(false);
        }
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(true)
    }
}

/// Render a millisecond timestamp for humans
pub fn format_timestamp(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| millis.to_string())
}

pub fn print_certificate(cert: &Certificate) {
    println!("Certificate {}", cert.certificate_id);
    println!("  Learner:       {}", cert.learner);
    println!("  Registration:  {}", cert.registration_number);
    println!("  Course:        {} ({})", cert.course_title, cert.course);
    println!("  Issued:        {}", format_timestamp(cert.issued_at));
    if cert.updated_at != cert.issued_at {
        println!("  Updated:       {}", format_timestamp(cert.updated_at));
    }
}
