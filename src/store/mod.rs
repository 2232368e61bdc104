//! SQLite backing store
//!
//! # Usage
//!
//! ```ignore
//! let db = ProgressDb::open(&path, DEFAULT_TIMEOUT)?;
//! let progress = ProgressStore::new(db.clone());
//! let badges = BadgeRepository::new(db.clone());
//! ```

mod badges;
mod certificates;
mod db;
mod identity;
mod progress;

pub use badges::BadgeRepository;
pub use certificates::CertificateRepository;
pub use db::{DEFAULT_TIMEOUT, ProgressDb};
pub use identity::{
    IdentityDirectory, SqliteIdentityDirectory, StaticIdentityDirectory, generate_registration_number,
};
pub use progress::{ProgressStore, completion_percentage};

/// Result of an insert guarded by a uniqueness constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// This call created the row
    Inserted,
    /// The row already existed (possibly created concurrently)
    Conflict,
}

impl InsertOutcome {
    fn from_changes(changed: usize) -> Self {
        if changed > 0 {
            Self::Inserted
        } else {
            Self::Conflict
        }
    }
}
