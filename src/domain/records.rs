//! Persisted per-learner records

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::ids::{CourseId, LearnerId, RegistrationNumber, UnitId};

/// Completion state of one learner in one course
///
/// The percentage is never stored; it is derived from `completed_units`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearnerProgress {
    pub learner: LearnerId,
    pub course: CourseId,
    pub completed_units: BTreeSet<UnitId>,
    /// Milliseconds since epoch of the last completion toggle
    pub last_activity_at: Option<i64>,
}

/// Completion certificate, at most one per (learner, course)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    /// Public certificate number (UUID v4)
    pub certificate_id: String,
    pub learner: LearnerId,
    pub course: CourseId,
    pub course_title: String,
    /// Copy of the learner's registration number, repaired on drift
    pub registration_number: RegistrationNumber,
    /// Milliseconds since epoch
    pub issued_at: i64,
    pub updated_at: i64,
}
