//! Completion certificate issuance
//!
//! Issuance converges: any number of calls, concurrent or repeated, leave
//! exactly one certificate per (learner, course) whose registration number
//! matches the learner's identity record.

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::{Certificate, CourseId, LearnerId, RegistrationNumber};
use crate::error::{EngineError, Result};
use crate::store::{CertificateRepository, InsertOutcome};

/// Percentage required for a certificate
pub const CERTIFICATE_MILESTONE: u8 = 100;

/// What an issuance attempt did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CertificateOutcome {
    /// Course not finished yet
    NotEligible { percentage: u8 },
    /// This call created the certificate
    Issued(Certificate),
    /// Certificate already existed and is up to date
    Existing(Certificate),
    /// Certificate existed with a stale registration number, now fixed
    Repaired {
        certificate: Certificate,
        previous: RegistrationNumber,
    },
}

impl CertificateOutcome {
    pub fn certificate(&self) -> Option<&Certificate> {
        match self {
            Self::NotEligible { .. } => None,
            Self::Issued(cert) | Self::Existing(cert) => Some(cert),
            Self::Repaired { certificate, .. } => Some(certificate),
        }
    }

    pub fn into_certificate(self) -> Option<Certificate> {
        match self {
            Self::NotEligible { .. } => None,
            Self::Issued(cert) | Self::Existing(cert) => Some(cert),
            Self::Repaired { certificate, .. } => Some(certificate),
        }
    }
}

/// Creates and repairs certificates
#[derive(Clone)]
pub struct CertificateIssuer {
    repo: CertificateRepository,
}

impl CertificateIssuer {
    pub fn new(repo: CertificateRepository) -> Self {
        Self { repo }
    }

    /// Issue, return or repair the certificate for a finished course
    ///
    /// A missing registration number only fails the call when a new
    /// certificate would have to be created.
    pub fn issue(
        &self,
        learner: &LearnerId,
        course: &CourseId,
        percentage: u8,
        course_title: &str,
        registration_number: Option<&RegistrationNumber>,
    ) -> Result<CertificateOutcome> {
        if percentage < CERTIFICATE_MILESTONE {
            return Ok(CertificateOutcome::NotEligible { percentage });
        }

        if let Some(existing) = self.repo.find(learner, course)? {
            return self.reconcile(existing, registration_number);
        }

        let registration_number = registration_number
            .ok_or_else(|| EngineError::MissingRegistrationNumber(learner.to_string()))?;

        let now = Utc::now().timestamp_millis();
        let certificate = Certificate {
            certificate_id: Uuid::new_v4().to_string(),
            learner: learner.clone(),
            course: course.clone(),
            course_title: course_title.to_string(),
            registration_number: registration_number.clone(),
            issued_at: now,
            updated_at: now,
        };

        match self.repo.insert_if_absent(&certificate)? {
            InsertOutcome::Inserted => {
                info!(
                    learner = %learner,
                    course = %course,
                    certificate_id = %certificate.certificate_id,
                    "certificate issued"
                );
                Ok(CertificateOutcome::Issued(certificate))
            }
            InsertOutcome::Conflict => {
                debug!(learner = %learner, course = %course, "certificate issued concurrently");
                let existing = self.load(learner, course)?;
                self.reconcile(existing, Some(registration_number))
            }
        }
    }

    /// Stored certificate, if any
    pub fn find(&self, learner: &LearnerId, course: &CourseId) -> Result<Option<Certificate>> {
        self.repo.find(learner, course)
    }

    /// Stored certificate, repaired first if its registration number drifted
    pub fn refresh(
        &self,
        learner: &LearnerId,
        course: &CourseId,
        registration_number: Option<&RegistrationNumber>,
    ) -> Result<Option<Certificate>> {
        match self.repo.find(learner, course)? {
            Some(existing) => Ok(self.reconcile(existing, registration_number)?.into_certificate()),
            None => Ok(None),
        }
    }

    fn reconcile(
        &self,
        existing: Certificate,
        registration_number: Option<&RegistrationNumber>,
    ) -> Result<CertificateOutcome> {
        let Some(current) = registration_number else {
            return Ok(CertificateOutcome::Existing(existing));
        };
        if *current == existing.registration_number {
            return Ok(CertificateOutcome::Existing(existing));
        }

        let changed = self
            .repo
            .repair_registration_number(&existing.learner, &existing.course, current)?;
        let certificate = self.load(&existing.learner, &existing.course)?;
        if !changed {
            return Ok(CertificateOutcome::Existing(certificate));
        }

        info!(
            learner = %certificate.learner,
            course = %certificate.course,
            from = %existing.registration_number,
            to = %current,
            "certificate registration number repaired"
        );
        Ok(CertificateOutcome::Repaired {
            certificate,
            previous: existing.registration_number,
        })
    }

    fn load(&self, learner: &LearnerId, course: &CourseId) -> Result<Certificate> {
        self.repo.find(learner, course)?.ok_or_else(|| {
            EngineError::CorruptRecord(format!(
                "certificate for '{}' in '{}' disappeared",
                learner, course
            ))
        })
    }
}
