//! Learner identity collaborator
//!
//! Registration numbers are assigned once per learner and never reassigned.
//! The engine only reads them; assignment exists for tooling and tests.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;
use rusqlite::{ErrorCode, OptionalExtension, params};
use tracing::info;
use uuid::Uuid;

use super::db::ProgressDb;
use crate::domain::{LearnerId, RegistrationNumber};
use crate::error::{EngineError, Result};

/// Attempts before giving up on generating an unused registration number
const GENERATE_ATTEMPTS: usize = 3;

/// Read access to learners' registration numbers
pub trait IdentityDirectory: Send + Sync {
    /// The learner's registration number, `None` if not yet assigned
    fn registration_number(&self, learner: &LearnerId) -> Result<Option<RegistrationNumber>>;
}

/// Registration numbers stored in the progress database
#[derive(Clone)]
pub struct SqliteIdentityDirectory {
    db: ProgressDb,
}

impl SqliteIdentityDirectory {
    pub fn new(db: ProgressDb) -> Self {
        Self { db }
    }

    /// Assign `number` to `learner` unless the learner already has one
    ///
    /// Returns the learner's effective registration number, which is the
    /// previously assigned one if there was any. Fails with `Validation` if
    /// the number already belongs to a different learner.
    pub fn assign(&self, learner: &LearnerId, number: &RegistrationNumber) -> Result<RegistrationNumber> {
        let now = Utc::now().timestamp_millis();
        let conn = self.db.conn()?;
        let inserted = conn.execute(
            r#"INSERT INTO learner_identities (learner, registration_number, assigned_at)
               VALUES (?1, ?2, ?3)
               ON CONFLICT(learner) DO NOTHING"#,
            params![learner.as_str(), number.as_str(), now],
        );

        match inserted {
            Ok(1) => {
                info!(learner = %learner, registration_number = %number, "registration number assigned");
            }
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                return Err(EngineError::validation(
                    "registration_number",
                    format!("'{}' already belongs to another learner", number),
                ));
            }
            Err(e) => return Err(e.into()),
        }
        drop(conn);

        self.registration_number(learner)?.ok_or_else(|| {
            EngineError::CorruptRecord(format!("identity for '{}' vanished after insert", learner))
        })
    }

    /// Assign a freshly generated registration number unless one exists
    pub fn assign_generated(&self, learner: &LearnerId) -> Result<RegistrationNumber> {
        let mut last_err = None;
        for _ in 0..GENERATE_ATTEMPTS {
            let candidate = generate_registration_number()?;
            match self.assign(learner, &candidate) {
                Ok(number) => return Ok(number),
                Err(e @ EngineError::Validation { .. }) => last_err = Some(e),
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            EngineError::StorageUnavailable("could not generate a registration number".to_string())
        }))
    }
}

impl IdentityDirectory for SqliteIdentityDirectory {
    fn registration_number(&self, learner: &LearnerId) -> Result<Option<RegistrationNumber>> {
        let conn = self.db.conn()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT registration_number FROM learner_identities WHERE learner = ?1",
                params![learner.as_str()],
                |r| r.get(0),
            )
            .optional()?;
        raw.map(|n| {
            RegistrationNumber::parse(n)
                .map_err(|e| EngineError::CorruptRecord(format!("identity of '{}': {}", learner, e)))
        })
        .transpose()
    }
}

/// In-memory directory for embedding behind another identity service
#[derive(Debug, Default)]
pub struct StaticIdentityDirectory {
    numbers: RwLock<HashMap<LearnerId, RegistrationNumber>>,
}

impl StaticIdentityDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mirror the number held by the upstream directory
    pub fn set(&self, learner: LearnerId, number: RegistrationNumber) {
        let mut numbers = self.numbers.write().unwrap_or_else(|e| e.into_inner());
        numbers.insert(learner, number);
    }
}

impl IdentityDirectory for StaticIdentityDirectory {
    fn registration_number(&self, learner: &LearnerId) -> Result<Option<RegistrationNumber>> {
        let numbers = self.numbers.read().unwrap_or_else(|e| e.into_inner());
        Ok(numbers.get(learner).cloned())
    }
}

/// `REG-` followed by 12 upper-case hex digits
pub fn generate_registration_number() -> Result<RegistrationNumber> {
    let hex = Uuid::new_v4().simple().to_string().to_uppercase();
    RegistrationNumber::parse(format!("REG-{}", &hex[..12]))
}
