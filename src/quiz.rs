//! Section quiz grading
//!
//! Grading is a pure function of the submitted answers. Only a passing
//! submission touches the store, and only ever to mark the quiz unit
//! complete, so a later failing attempt cannot take a pass away.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{CourseId, LearnerId, QuizQuestion, Section, UnitId};
use crate::error::{EngineError, Result};
use crate::store::{ProgressStore, completion_percentage};

/// Minimum score (percent) that passes a quiz
pub const PASS_THRESHOLD: u8 = 55;

/// Submitted answers: question index -> chosen option index
///
/// Unanswered questions are simply absent and count as incorrect.
pub type QuizAnswers = BTreeMap<usize, usize>;

/// Outcome of grading one submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizGrade {
    pub score: u8,
    pub correct_count: usize,
    pub total_questions: usize,
    pub passed: bool,
}

/// Score a submission against the question list
pub fn grade(questions: &[QuizQuestion], answers: &QuizAnswers) -> QuizGrade {
    let correct_count = questions
        .iter()
        .enumerate()
        .filter(|(idx, q)| answers.get(idx) == Some(&q.correct_option))
        .count();
    let score = completion_percentage(correct_count, questions.len());

    QuizGrade {
        score,
        correct_count,
        total_questions: questions.len(),
        passed: !questions.is_empty() && score >= PASS_THRESHOLD,
    }
}

/// A graded submission and, on a pass, the updated completed-unit set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizSubmission {
    pub grade: QuizGrade,
    pub quiz_unit: UnitId,
    /// `Some` only when the pass was recorded
    pub completed_units: Option<BTreeSet<UnitId>>,
}

/// Grades quizzes and records passes
#[derive(Clone)]
pub struct QuizGrader {
    progress: ProgressStore,
}

impl QuizGrader {
    pub fn new(progress: ProgressStore) -> Self {
        Self { progress }
    }

    /// Grade `answers` for the section's quiz and complete its unit on a pass
    ///
    /// There is no attempt limit and no memory of earlier attempts.
    pub fn submit(
        &self,
        learner: &LearnerId,
        course: &CourseId,
        section: &Section,
        answers: &QuizAnswers,
    ) -> Result<QuizSubmission> {
        let questions = section
            .quiz()
            .ok_or_else(|| EngineError::NoQuiz(section.id.to_string()))?;
        let quiz_unit = UnitId::quiz_for(&section.id);
        let grade = grade(questions, answers);

        debug!(
            learner = %learner,
            course = %course,
            section = %section.id,
            score = grade.score,
            passed = grade.passed,
            "quiz graded"
        );

        let completed_units = if grade.passed {
            Some(self.progress.set_unit_completion(learner, course, &quiz_unit, true)?)
        } else {
            None
        };

        Ok(QuizSubmission {
            grade,
            quiz_unit,
            completed_units,
        })
    }
}
