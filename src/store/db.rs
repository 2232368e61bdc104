//! SQLite database connection and schema management for progress data
//!
//! Manages the `~/.coursetrack/progress.db` database. Every uniqueness rule
//! the evaluators rely on (one award per learner and badge, one certificate
//! per learner and course) is a table constraint here, not an application check.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::Connection;

use crate::config::Config;
use crate::error::{EngineError, Result};

/// Default wait on a locked database before giving up
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// Database wrapper shared by the repositories
///
/// One handle serializes access through its mutex. Separate handles opened on
/// the same file are independent connections and rely on SQLite locking.
#[derive(Clone)]
pub struct ProgressDb {
    conn: Arc<Mutex<Connection>>,
}

impl ProgressDb {
    /// Open or create the database at the location named by the config
    pub fn open_with_config(config: &Config) -> Result<Self> {
        Self::open(&config.database_path(), config.store.timeout())
    }

    /// Open or create the database at a specific path
    ///
    /// `timeout` bounds how long any statement waits on another writer; on
    /// expiry the statement fails with `StorageUnavailable`.
    pub fn open(path: &Path, timeout: Duration) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                EngineError::StorageUnavailable(format!(
                    "Failed to create database dir {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(timeout)?;

        // WAL lets readers proceed while one writer holds the lock
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        Self::from_connection(conn)
    }

    /// Private in-memory database, used by tests and one-shot tooling
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Lock the connection
    pub(crate) fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| EngineError::StorageUnavailable("database lock poisoned".to_string()))
    }

    /// Initialize the database schema
    fn init_schema(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(SCHEMA_SQL)?;
        conn.execute(
            "INSERT OR IGNORE INTO schema_version VALUES (?1)",
            [SCHEMA_VERSION],
        )?;
        Ok(())
    }

    /// Highest applied schema version
    pub fn schema_version(&self) -> Result<i32> {
        let conn = self.conn()?;
        let version = conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |r| r.get(0),
        )?;
        Ok(version)
    }
}

/// SQL schema for the progress database
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY);

-- One row per (learner, course); created by the first completion toggle
CREATE TABLE IF NOT EXISTS learner_progress (
    learner TEXT NOT NULL,
    course TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    last_activity_at INTEGER NOT NULL,
    PRIMARY KEY (learner, course)
);

-- Completed-unit set, one row per member so add/remove touch a single row
CREATE TABLE IF NOT EXISTS completed_units (
    learner TEXT NOT NULL,
    course TEXT NOT NULL,
    unit_id TEXT NOT NULL,
    completed_at INTEGER NOT NULL,
    PRIMARY KEY (learner, course, unit_id),
    FOREIGN KEY (learner, course) REFERENCES learner_progress(learner, course)
);

-- ============================================
-- BADGES
-- ============================================

CREATE TABLE IF NOT EXISTS badge_definitions (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    milestone_type TEXT NOT NULL,
    milestone_value INTEGER NOT NULL CHECK (milestone_value BETWEEN 0 AND 100),
    scope_course TEXT,                      -- NULL = all courses
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS badge_awards (
    learner TEXT NOT NULL,
    badge_id TEXT NOT NULL,
    course TEXT NOT NULL,                   -- course whose progress earned it
    awarded_at INTEGER NOT NULL,
    PRIMARY KEY (learner, badge_id)
);

CREATE TRIGGER IF NOT EXISTS badge_awards_permanent_delete
BEFORE DELETE ON badge_awards
BEGIN
    SELECT RAISE(ABORT, 'badge awards are permanent');
END;

CREATE TRIGGER IF NOT EXISTS badge_awards_permanent_update
BEFORE UPDATE ON badge_awards
BEGIN
    SELECT RAISE(ABORT, 'badge awards are permanent');
END;

-- ============================================
-- IDENTITY & CERTIFICATES
-- ============================================

CREATE TABLE IF NOT EXISTS learner_identities (
    learner TEXT PRIMARY KEY,
    registration_number TEXT NOT NULL UNIQUE,
    assigned_at INTEGER NOT NULL
);

CREATE TRIGGER IF NOT EXISTS learner_identities_immutable
BEFORE UPDATE ON learner_identities
BEGIN
    SELECT RAISE(ABORT, 'registration numbers are never reassigned');
END;

CREATE TABLE IF NOT EXISTS certificates (
    certificate_id TEXT NOT NULL UNIQUE,
    learner TEXT NOT NULL,
    course TEXT NOT NULL,
    course_title TEXT NOT NULL,
    registration_number TEXT NOT NULL,
    issued_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    PRIMARY KEY (learner, course)
);
CREATE INDEX IF NOT EXISTS idx_certificates_registration ON certificates(registration_number);

CREATE TRIGGER IF NOT EXISTS certificates_permanent
BEFORE DELETE ON certificates
BEGIN
    SELECT RAISE(ABORT, 'certificates are permanent');
END;
"#;
