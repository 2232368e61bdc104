//! Certificate persistence

use chrono::Utc;
use rusqlite::{OptionalExtension, Row, params};

use super::InsertOutcome;
use super::db::ProgressDb;
use crate::domain::{Certificate, CourseId, LearnerId, RegistrationNumber};
use crate::error::{EngineError, Result};

const SELECT_COLUMNS: &str = "certificate_id, learner, course, course_title, registration_number, issued_at, updated_at";

/// Repository for certificates. There is no delete path.
#[derive(Clone)]
pub struct CertificateRepository {
    db: ProgressDb,
}

impl CertificateRepository {
    pub fn new(db: ProgressDb) -> Self {
        Self { db }
    }

    /// Certificate for (learner, course)
    pub fn find(&self, learner: &LearnerId, course: &CourseId) -> Result<Option<Certificate>> {
        let conn = self.db.conn()?;
        let raw = conn
            .query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM certificates WHERE learner = ?1 AND course = ?2"),
                params![learner.as_str(), course.as_str()],
                RawCertificate::from_row,
            )
            .optional()?;
        raw.map(RawCertificate::into_certificate).transpose()
    }

    /// Certificate by its public certificate number
    pub fn find_by_id(&self, certificate_id: &str) -> Result<Option<Certificate>> {
        let conn = self.db.conn()?;
        let raw = conn
            .query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM certificates WHERE certificate_id = ?1"),
                params![certificate_id],
                RawCertificate::from_row,
            )
            .optional()?;
        raw.map(RawCertificate::into_certificate).transpose()
    }

    /// All certificates of a learner, oldest first
    pub fn list_for(&self, learner: &LearnerId) -> Result<Vec<Certificate>> {
        let conn = self.db.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM certificates WHERE learner = ?1 ORDER BY issued_at, course"
        ))?;
        let rows: Vec<RawCertificate> = stmt
            .query_map(params![learner.as_str()], RawCertificate::from_row)?
            .collect::<rusqlite::Result<_>>()?;
        rows.into_iter().map(RawCertificate::into_certificate).collect()
    }

    /// Insert unless a certificate for (learner, course) already exists
    pub fn insert_if_absent(&self, cert: &Certificate) -> Result<InsertOutcome> {
        let conn = self.db.conn()?;
        let changed = conn.execute(
            r#"INSERT INTO certificates
               (certificate_id, learner, course, course_title, registration_number, issued_at, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
               ON CONFLICT(learner, course) DO NOTHING"#,
            params![
                cert.certificate_id,
                cert.learner.as_str(),
                cert.course.as_str(),
                cert.course_title,
                cert.registration_number.as_str(),
                cert.issued_at,
                cert.updated_at,
            ],
        )?;
        Ok(InsertOutcome::from_changes(changed))
    }

    /// Point the certificate at `registration_number` if it differs
    ///
    /// Returns true when a row was changed.
    pub fn repair_registration_number(
        &self,
        learner: &LearnerId,
        course: &CourseId,
        registration_number: &RegistrationNumber,
    ) -> Result<bool> {
        let now = Utc::now().timestamp_millis();
        let conn = self.db.conn()?;
        let changed = conn.execute(
            r#"UPDATE certificates SET registration_number = ?3, updated_at = ?4
               WHERE learner = ?1 AND course = ?2 AND registration_number <> ?3"#,
            params![learner.as_str(), course.as_str(), registration_number.as_str(), now],
        )?;
        Ok(changed > 0)
    }
}

struct RawCertificate {
    certificate_id: String,
    learner: String,
    course: String,
    course_title: String,
    registration_number: String,
    issued_at: i64,
    updated_at: i64,
}

impl RawCertificate {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            certificate_id: row.get(0)?,
            learner: row.get(1)?,
            course: row.get(2)?,
            course_title: row.get(3)?,
            registration_number: row.get(4)?,
            issued_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    fn into_certificate(self) -> Result<Certificate> {
        let id = self.certificate_id.clone();
        let corrupt = |e: EngineError| EngineError::CorruptRecord(format!("certificate {}: {}", id, e));
        let learner = LearnerId::parse(self.learner).map_err(corrupt)?;
        let course = CourseId::parse(self.course).map_err(corrupt)?;
        let registration_number = RegistrationNumber::parse(self.registration_number).map_err(corrupt)?;
        Ok(Certificate {
            learner,
            course,
            registration_number,
            certificate_id: self.certificate_id,
            course_title: self.course_title,
            issued_at: self.issued_at,
            updated_at: self.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn certificate(id: &str, reg: &str) -> Certificate {
        Certificate {
            certificate_id: id.to_string(),
            learner: LearnerId::parse("alice").unwrap(),
            course: CourseId::parse("c1").unwrap(),
            course_title: "Course One".to_string(),
            registration_number: RegistrationNumber::parse(reg).unwrap(),
            issued_at: 10,
            updated_at: 10,
        }
    }

    #[test]
    fn test_insert_if_absent_keeps_first() {
        let repo = CertificateRepository::new(ProgressDb::open_in_memory().unwrap());
        let first = certificate("cert-1", "REG-1");

        assert_eq!(repo.insert_if_absent(&first).unwrap(), InsertOutcome::Inserted);
        assert_eq!(
            repo.insert_if_absent(&certificate("cert-2", "REG-1")).unwrap(),
            InsertOutcome::Conflict
        );

        let stored = repo.find(&first.learner, &first.course).unwrap().unwrap();
        assert_eq!(stored, first);
        assert_eq!(repo.find_by_id("cert-1").unwrap(), Some(first));
        assert!(repo.find_by_id("cert-2").unwrap().is_none());
    }

    #[test]
    fn test_repair_registration_number() {
        let repo = CertificateRepository::new(ProgressDb::open_in_memory().unwrap());
        let cert = certificate("cert-1", "REG-OLD");
        repo.insert_if_absent(&cert).unwrap();

        let new_reg = RegistrationNumber::parse("REG-NEW").unwrap();
        assert!(repo.repair_registration_number(&cert.learner, &cert.course, &new_reg).unwrap());
        assert!(!repo.repair_registration_number(&cert.learner, &cert.course, &new_reg).unwrap());

        let stored = repo.find(&cert.learner, &cert.course).unwrap().unwrap();
        assert_eq!(stored.registration_number, new_reg);
        assert_eq!(stored.certificate_id, "cert-1");
        assert_eq!(stored.issued_at, 10);
    }
}
