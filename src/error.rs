//! Error taxonomy for the progress engine
//!
//! Only genuine failures live here. "Not yet eligible" and "lost a uniqueness
//! race" are ordinary results (`CertificateOutcome::NotEligible` and
//! `InsertOutcome::Conflict`) and never surface as errors.

use rusqlite::ErrorCode;

/// Result alias used throughout the engine
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors returned by engine operations
///
/// Every variant is scoped to a single request. `StorageUnavailable` is safe
/// to retry because all writes are idempotent or conditional inserts.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("Unknown course: {0}")]
    UnknownCourse(String),

    #[error("Unit '{unit}' is not part of course '{course}'")]
    UnknownUnit { course: String, unit: String },

    #[error("Section '{section}' is not part of course '{course}'")]
    UnknownSection { course: String, section: String },

    #[error("Section '{0}' has no quiz")]
    NoQuiz(String),

    #[error("Learner '{0}' has no registration number yet")]
    MissingRegistrationNumber(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Corrupt record: {0}")]
    CorruptRecord(String),

    /// The store refused the statement (constraint, trigger or SQL error).
    /// Repeating the call fails the same way.
    #[error("Store rejected write: {0}")]
    StoreRejected(String),
}

impl EngineError {
    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// Whether the whole call may simply be retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_))
    }
}

impl From<rusqlite::Error> for EngineError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::FromSqlConversionFailure(..)
            | rusqlite::Error::InvalidColumnType(..)
            | rusqlite::Error::IntegralValueOutOfRange(..) => Self::CorruptRecord(err.to_string()),
            rusqlite::Error::SqliteFailure(e, _) => match e.code {
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => {
                    Self::StorageUnavailable(format!("timed out waiting for store: {}", err))
                }
                ErrorCode::SystemIoFailure
                | ErrorCode::CannotOpen
                | ErrorCode::DiskFull
                | ErrorCode::OutOfMemory
                | ErrorCode::FileLockingProtocolFailed
                | ErrorCode::PermissionDenied
                | ErrorCode::ReadOnly
                | ErrorCode::OperationInterrupted => Self::StorageUnavailable(err.to_string()),
                ErrorCode::DatabaseCorrupt | ErrorCode::NotADatabase => {
                    Self::CorruptRecord(err.to_string())
                }
                _ => Self::StoreRejected(err.to_string()),
            },
            rusqlite::Error::InvalidPath(_) => Self::StorageUnavailable(err.to_string()),
            _ => Self::StoreRejected(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_maps_to_storage_unavailable() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        let mapped = EngineError::from(err);
        assert!(matches!(mapped, EngineError::StorageUnavailable(_)));
        assert!(mapped.is_retryable());
    }

    #[test]
    fn test_decode_failure_is_corrupt_record() {
        let err = rusqlite::Error::InvalidColumnType(
            0,
            "milestone_value".to_string(),
            rusqlite::types::Type::Text,
        );
        let mapped = EngineError::from(err);
        assert!(matches!(mapped, EngineError::CorruptRecord(_)));
        assert!(!mapped.is_retryable());
    }

    #[test]
    fn test_constraint_abort_is_not_retryable() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT),
            Some("certificates are permanent".to_string()),
        );
        let mapped = EngineError::from(err);
        assert!(matches!(mapped, EngineError::StoreRejected(_)));
        assert!(!mapped.is_retryable());
    }

    #[test]
    fn test_io_failure_is_retryable() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_IOERR),
            None,
        );
        assert!(EngineError::from(err).is_retryable());
    }

    #[test]
    fn test_trigger_abort_from_real_statement() {
        let db = crate::store::ProgressDb::open_in_memory().unwrap();
        let conn = db.conn().unwrap();
        conn.execute(
            r#"INSERT INTO certificates
               (certificate_id, learner, course, course_title, registration_number, issued_at, updated_at)
               VALUES ('id-1', 'alice', 'c1', 'C1', 'REG-1', 0, 0)"#,
            [],
        )
        .unwrap();
        let err = conn
            .execute("DELETE FROM certificates WHERE learner = 'alice'", [])
            .unwrap_err();
        let mapped = EngineError::from(err);
        assert!(matches!(mapped, EngineError::StoreRejected(_)), "{:?}", mapped);
        assert!(!mapped.is_retryable());
    }

    #[test]
    fn test_validation_message() {
        let err = EngineError::validation("learner", "must not be empty");
        assert_eq!(err.to_string(), "Invalid learner: must not be empty");
    }
}
