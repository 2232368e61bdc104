//! Engine facade
//!
//! Ties the curriculum, progress store, quiz grader, badge evaluator and
//! certificate issuer together behind the operations the calling layer uses.
//! Raw identifiers are validated here before anything touches the store.
//!
//! ```text
//!  unit toggle ──────────────┐
//!                            ▼
//!  quiz answers ─► QuizGrader ─► ProgressStore ─► percentage
//!                                                   │
//!                               ┌───────────────────┴──────────┐
//!                               ▼                              ▼
//!                        BadgeEvaluator                CertificateIssuer
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use crate::badges::BadgeEvaluator;
use crate::certificates::{CertificateIssuer, CertificateOutcome};
use crate::config::Config;
use crate::curriculum::{
    CurriculumSource, DirectoryCatalog, ResolvedCurriculum, check_unique_units,
};
use crate::domain::{
    BadgeAward, BadgeDefinition, Certificate, Course, CourseId, LearnerId, SectionId, UnitId,
};
use crate::error::{EngineError, Result};
use crate::quiz::{QuizAnswers, QuizGrade, QuizGrader};
use crate::store::{
    BadgeRepository, CertificateRepository, IdentityDirectory, ProgressDb, ProgressStore,
    SqliteIdentityDirectory,
};

/// Result of `submit_unit_completion`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionOutcome {
    pub percentage: u8,
    pub new_badges: Vec<BadgeDefinition>,
    pub certificate: Option<Certificate>,
    /// Course is finished but no certificate could be issued because the
    /// learner has no registration number yet
    pub awaiting_registration: bool,
}

/// Result of `submit_quiz_answers`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizOutcome {
    pub score: u8,
    pub passed: bool,
    pub grade: QuizGrade,
    pub percentage: u8,
    pub new_badges: Vec<BadgeDefinition>,
    pub certificate: Option<Certificate>,
    pub awaiting_registration: bool,
}

/// Read-only progress view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    pub learner: LearnerId,
    pub course: CourseId,
    pub percentage: u8,
    pub completed_units: usize,
    pub total_units: usize,
    pub last_activity_at: Option<i64>,
    /// First lecture in document order the learner has not completed
    pub next_lecture: Option<UnitId>,
}

/// Progress, badge and certificate engine
#[derive(Clone)]
pub struct ProgressEngine {
    progress: ProgressStore,
    quiz: QuizGrader,
    badge_repo: BadgeRepository,
    badges: BadgeEvaluator,
    certificate_repo: CertificateRepository,
    certificates: CertificateIssuer,
    catalog: Arc<dyn CurriculumSource>,
    identity: Arc<dyn IdentityDirectory>,
}

impl ProgressEngine {
    /// Build an engine over an open database and the two collaborators
    pub fn new(
        db: ProgressDb,
        catalog: Arc<dyn CurriculumSource>,
        identity: Arc<dyn IdentityDirectory>,
    ) -> Self {
        let progress = ProgressStore::new(db.clone());
        let badge_repo = BadgeRepository::new(db.clone());
        let certificate_repo = CertificateRepository::new(db);
        Self {
            quiz: QuizGrader::new(progress.clone()),
            badges: BadgeEvaluator::new(badge_repo.clone()),
            certificates: CertificateIssuer::new(certificate_repo.clone()),
            progress,
            badge_repo,
            certificate_repo,
            catalog,
            identity,
        }
    }

    /// Engine backed by the configured database, curriculum directory and
    /// the database's own identity table
    pub fn open(config: &Config) -> Result<Self> {
        let db = ProgressDb::open_with_config(config)?;
        let catalog = Arc::new(DirectoryCatalog::new(config.curriculum_dir()));
        let identity = Arc::new(SqliteIdentityDirectory::new(db.clone()));
        Ok(Self::new(db, catalog, identity))
    }

    /// Run engine work on the blocking pool, bounded by `timeout`
    ///
    /// On expiry the caller gets `StorageUnavailable`. The abandoned work
    /// still finishes in the background; every write is atomic, so it either
    /// committed fully or not at all and the call can be retried.
    pub async fn call<T, F>(&self, timeout: Duration, work: F) -> Result<T>
    where
        F: FnOnce(&ProgressEngine) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let engine = self.clone();
        let task = tokio::task::spawn_blocking(move || work(&engine));
        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(EngineError::StorageUnavailable(format!(
                "engine task failed: {}",
                join_err
            ))),
            Err(_) => Err(EngineError::StorageUnavailable(format!(
                "timed out after {}ms",
                timeout.as_millis()
            ))),
        }
    }

    // ========================================
    // COMPLETION EVENTS
    // ========================================

    /// Mark a unit complete or incomplete and evaluate badges and certificate
    pub fn submit_unit_completion(
        &self,
        learner: &str,
        course: &str,
        unit: &str,
        completed: bool,
    ) -> Result<CompletionOutcome> {
        let learner = LearnerId::parse(learner)?;
        let course_id = CourseId::parse(course)?;
        let unit = UnitId::parse(unit)?;

        let course = self.load_course(&course_id)?;
        let resolved = ResolvedCurriculum::resolve(&course.curriculum);
        if !resolved.contains(&unit) {
            return Err(EngineError::UnknownUnit {
                course: course_id.to_string(),
                unit: unit.to_string(),
            });
        }

        self.progress
            .set_unit_completion(&learner, &course_id, &unit, completed)?;
        let percentage =
            self.progress
                .compute_percentage(&learner, &course_id, resolved.total_units())?;

        let (new_badges, certificate, awaiting_registration) =
            self.after_progress(&learner, &course, percentage)?;

        Ok(CompletionOutcome {
            percentage,
            new_badges,
            certificate,
            awaiting_registration,
        })
    }

    /// Grade a section quiz; a pass completes the section's quiz unit
    pub fn submit_quiz_answers(
        &self,
        learner: &str,
        course: &str,
        section: &str,
        answers: &QuizAnswers,
    ) -> Result<QuizOutcome> {
        let learner = LearnerId::parse(learner)?;
        let course_id = CourseId::parse(course)?;
        let section_id = SectionId::parse(section)?;

        let course = self.load_course(&course_id)?;
        let section = course.curriculum.section(&section_id).ok_or_else(|| {
            EngineError::UnknownSection {
                course: course_id.to_string(),
                section: section_id.to_string(),
            }
        })?;
        let total_units = ResolvedCurriculum::resolve(&course.curriculum).total_units();

        let submission = self.quiz.submit(&learner, &course_id, section, answers)?;
        let percentage = self
            .progress
            .compute_percentage(&learner, &course_id, total_units)?;

        let (new_badges, certificate, awaiting_registration) = if submission.grade.passed {
            self.after_progress(&learner, &course, percentage)?
        } else {
            // A failed attempt changes nothing; report what already exists
            (Vec::new(), self.certificates.find(&learner, &course_id)?, false)
        };

        Ok(QuizOutcome {
            score: submission.grade.score,
            passed: submission.grade.passed,
            grade: submission.grade,
            percentage,
            new_badges,
            certificate,
            awaiting_registration,
        })
    }

    /// Badge evaluation and certificate issuance after a progress change
    fn after_progress(
        &self,
        learner: &LearnerId,
        course: &Course,
        percentage: u8,
    ) -> Result<(Vec<BadgeDefinition>, Option<Certificate>, bool)> {
        let new_badges = self.badges.evaluate(learner, &course.id, percentage)?;

        let registration_number = if percentage >= crate::certificates::CERTIFICATE_MILESTONE {
            self.identity.registration_number(learner)?
        } else {
            None
        };

        let outcome = self.certificates.issue(
            learner,
            &course.id,
            percentage,
            &course.title,
            registration_number.as_ref(),
        );
        match outcome {
            Ok(CertificateOutcome::NotEligible { .. }) => Ok((new_badges, None, false)),
            Ok(outcome) => {
                debug!(learner = %learner, course = %course.id, ?outcome, "certificate checked");
                Ok((new_badges, outcome.into_certificate(), false))
            }
            Err(EngineError::MissingRegistrationNumber(_)) => {
                warn!(
                    learner = %learner,
                    course = %course.id,
                    "course finished but learner has no registration number; certificate deferred"
                );
                Ok((new_badges, None, true))
            }
            Err(e) => Err(e),
        }
    }

    // ========================================
    // QUERIES
    // ========================================

    /// Certificate for (learner, course), repaired on access if it drifted
    pub fn get_certificate(&self, learner: &str, course: &str) -> Result<Option<Certificate>> {
        let learner = LearnerId::parse(learner)?;
        let course = CourseId::parse(course)?;
        let registration_number = self.identity.registration_number(&learner)?;
        self.certificates
            .refresh(&learner, &course, registration_number.as_ref())
    }

    /// Look up a certificate by its public number
    pub fn verify_certificate(&self, certificate_id: &str) -> Result<Option<Certificate>> {
        if certificate_id.trim().is_empty() {
            return Err(EngineError::validation("certificate_id", "must not be empty"));
        }
        self.certificate_repo.find_by_id(certificate_id.trim())
    }

    /// All certificates a learner holds
    pub fn certificates_for(&self, learner: &str) -> Result<Vec<Certificate>> {
        let learner = LearnerId::parse(learner)?;
        self.certificate_repo.list_for(&learner)
    }

    /// All badges a learner holds
    pub fn badges_for(&self, learner: &str) -> Result<Vec<BadgeAward>> {
        let learner = LearnerId::parse(learner)?;
        self.badge_repo.awards_for(&learner)
    }

    /// Current progress of a learner in a course
    pub fn get_progress(&self, learner: &str, course: &str) -> Result<ProgressSnapshot> {
        let learner = LearnerId::parse(learner)?;
        let course_id = CourseId::parse(course)?;
        let course = self.load_course(&course_id)?;
        let resolved = ResolvedCurriculum::resolve(&course.curriculum);

        let record = self.progress.progress(&learner, &course_id)?;
        let (completed, last_activity_at) = match record {
            Some(p) => (p.completed_units, p.last_activity_at),
            None => Default::default(),
        };
        let percentage =
            self.progress
                .compute_percentage(&learner, &course_id, resolved.total_units())?;

        Ok(ProgressSnapshot {
            next_lecture: resolved.first_incomplete_lecture(&completed).cloned(),
            completed_units: completed.len(),
            total_units: resolved.total_units(),
            learner,
            course: course_id,
            percentage,
            last_activity_at,
        })
    }

    /// Lecture after `unit` in document order
    pub fn next_lecture(&self, course: &str, unit: &str) -> Result<Option<UnitId>> {
        let (resolved, unit) = self.navigation(course, unit)?;
        Ok(resolved.next_lecture(&unit).cloned())
    }

    /// Lecture before `unit` in document order
    pub fn previous_lecture(&self, course: &str, unit: &str) -> Result<Option<UnitId>> {
        let (resolved, unit) = self.navigation(course, unit)?;
        Ok(resolved.previous_lecture(&unit).cloned())
    }

    fn navigation(&self, course: &str, unit: &str) -> Result<(ResolvedCurriculum, UnitId)> {
        let course_id = CourseId::parse(course)?;
        let unit = UnitId::parse(unit)?;
        let course = self.load_course(&course_id)?;
        Ok((ResolvedCurriculum::resolve(&course.curriculum), unit))
    }

    // ========================================
    // ADMINISTRATION
    // ========================================

    /// Create or replace a badge definition
    pub fn define_badge(&self, definition: &BadgeDefinition) -> Result<()> {
        self.badge_repo.upsert_definition(definition)
    }

    pub fn badge_definitions(&self) -> Result<Vec<BadgeDefinition>> {
        self.badge_repo.definitions()
    }

    fn load_course(&self, id: &CourseId) -> Result<Course> {
        let course = self
            .catalog
            .course(id)?
            .ok_or_else(|| EngineError::UnknownCourse(id.to_string()))?;
        // StaticCatalog and embedder sources are not checked on insert
        check_unique_units(&course)?;
        Ok(course)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curriculum::StaticCatalog;
    use crate::domain::{BadgeId, BadgeScope, Curriculum, Lecture, RegistrationNumber};
    use crate::store::StaticIdentityDirectory;

    fn engine_with(course: Course) -> (ProgressEngine, Arc<StaticIdentityDirectory>) {
        let identity = Arc::new(StaticIdentityDirectory::new());
        let engine = ProgressEngine::new(
            ProgressDb::open_in_memory().unwrap(),
            Arc::new(StaticCatalog::new().with_course(course)),
            identity.clone(),
        );
        (engine, identity)
    }

    fn flat_course(lectures: &[&str]) -> Course {
        Course {
            id: CourseId::parse("c1").unwrap(),
            title: "Course One".to_string(),
            curriculum: Curriculum::from_lectures(
                lectures
                    .iter()
                    .map(|id| Lecture {
                        id: UnitId::parse(*id).unwrap(),
                        duration: 60,
                    })
                    .collect(),
            ),
        }
    }

    #[test]
    fn test_validation_happens_before_store_access() {
        let (engine, _) = engine_with(flat_course(&["l1"]));
        assert!(matches!(
            engine.submit_unit_completion("", "c1", "l1", true),
            Err(EngineError::Validation { field: "learner", .. })
        ));
        assert!(matches!(
            engine.submit_unit_completion("alice", "c1", "bad unit", true),
            Err(EngineError::Validation { field: "unit", .. })
        ));
        assert!(matches!(
            engine.submit_unit_completion("alice", "nope", "l1", true),
            Err(EngineError::UnknownCourse(_))
        ));
        assert!(matches!(
            engine.submit_unit_completion("alice", "c1", "l9", true),
            Err(EngineError::UnknownUnit { .. })
        ));
        assert_eq!(engine.get_progress("alice", "c1").unwrap().completed_units, 0);
    }

    #[test]
    fn test_finishing_without_registration_defers_certificate() {
        let (engine, identity) = engine_with(flat_course(&["l1"]));
        let outcome = engine.submit_unit_completion("alice", "c1", "l1", true).unwrap();
        assert_eq!(outcome.percentage, 100);
        assert!(outcome.certificate.is_none());
        assert!(outcome.awaiting_registration);

        identity.set(
            LearnerId::parse("alice").unwrap(),
            RegistrationNumber::parse("REG-1").unwrap(),
        );
        let retry = engine.submit_unit_completion("alice", "c1", "l1", true).unwrap();
        assert!(!retry.awaiting_registration);
        assert_eq!(
            retry.certificate.unwrap().registration_number.as_str(),
            "REG-1"
        );
    }

    #[test]
    fn test_get_certificate_repairs_drift() {
        let (engine, identity) = engine_with(flat_course(&["l1"]));
        let alice = LearnerId::parse("alice").unwrap();
        identity.set(alice.clone(), RegistrationNumber::parse("OLD-1").unwrap());
        engine.submit_unit_completion("alice", "c1", "l1", true).unwrap();

        identity.set(alice, RegistrationNumber::parse("REG-7").unwrap());
        let cert = engine.get_certificate("alice", "c1").unwrap().unwrap();
        assert_eq!(cert.registration_number.as_str(), "REG-7");
        assert_eq!(engine.verify_certificate(&cert.certificate_id).unwrap(), Some(cert));
    }

    #[test]
    fn test_progress_snapshot_and_navigation() {
        let (engine, _) = engine_with(flat_course(&["l1", "l2", "l3"]));
        engine.submit_unit_completion("alice", "c1", "l1", true).unwrap();

        let snapshot = engine.get_progress("alice", "c1").unwrap();
        assert_eq!(snapshot.percentage, 33);
        assert_eq!(snapshot.completed_units, 1);
        assert_eq!(snapshot.total_units, 3);
        assert_eq!(snapshot.next_lecture, Some(UnitId::parse("l2").unwrap()));
        assert!(snapshot.last_activity_at.is_some());

        assert_eq!(
            engine.next_lecture("c1", "l2").unwrap(),
            Some(UnitId::parse("l3").unwrap())
        );
        assert_eq!(engine.previous_lecture("c1", "l1").unwrap(), None);
    }

    #[test]
    fn test_repeated_unit_rejected_before_any_write() {
        let (engine, _) = engine_with(flat_course(&["l1", "l2", "l1"]));
        assert!(matches!(
            engine.submit_unit_completion("alice", "c1", "l2", true),
            Err(EngineError::CorruptRecord(_))
        ));
        assert!(engine.badges_for("alice").unwrap().is_empty());
        let record = engine
            .progress
            .progress(
                &LearnerId::parse("alice").unwrap(),
                &CourseId::parse("c1").unwrap(),
            )
            .unwrap();
        assert!(record.is_none());
    }

    #[tokio::test]
    async fn test_call_times_out_as_storage_unavailable() {
        let (engine, _) = engine_with(flat_course(&["l1"]));
        let result = engine
            .call(Duration::from_millis(10), |_| {
                std::thread::sleep(Duration::from_millis(200));
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(EngineError::StorageUnavailable(_))));

        let outcome = engine
            .call(Duration::from_secs(5), |e| e.submit_unit_completion("alice", "c1", "l1", true))
            .await
            .unwrap();
        assert_eq!(outcome.percentage, 100);
    }

    #[test]
    fn test_badges_reported_once() {
        let (engine, _) = engine_with(flat_course(&["l1", "l2"]));
        engine
            .define_badge(
                &BadgeDefinition::percentage(
                    BadgeId::parse("half").unwrap(),
                    "Half",
                    50,
                    BadgeScope::All,
                )
                .unwrap(),
            )
            .unwrap();

        let first = engine.submit_unit_completion("alice", "c1", "l1", true).unwrap();
        assert_eq!(first.new_badges.len(), 1);
        let repeat = engine.submit_unit_completion("alice", "c1", "l1", true).unwrap();
        assert!(repeat.new_badges.is_empty());
        assert_eq!(engine.badges_for("alice").unwrap().len(), 1);
    }
}
