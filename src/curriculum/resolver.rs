//! Flattens a nested curriculum into progress units
//!
//! Every lecture is a unit, and every section with a quiz contributes one
//! extra synthetic unit (`quiz-<sectionId>`). Legacy standalone lectures
//! behave like lectures of a quiz-less section.

use std::collections::{BTreeSet, HashSet};

use crate::domain::{Course, Curriculum, CurriculumItem, UnitId};
use crate::error::{EngineError, Result};

/// Orderable units of a curriculum
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedCurriculum {
    /// Lecture units in document order (navigation order)
    lecture_units: Vec<UnitId>,
    /// Synthetic quiz units in document order
    quiz_units: Vec<UnitId>,
}

impl ResolvedCurriculum {
    pub fn resolve(curriculum: &Curriculum) -> Self {
        let mut resolved = Self::default();
        for item in curriculum.items() {
            match item {
                CurriculumItem::Section(section) => {
                    resolved
                        .lecture_units
                        .extend(section.lectures.iter().map(|l| l.id.clone()));
                    if let Some(quiz_unit) = section.quiz_unit() {
                        resolved.quiz_units.push(quiz_unit);
                    }
                }
                CurriculumItem::StandaloneLecture(lecture) => {
                    resolved.lecture_units.push(lecture.id.clone());
                }
            }
        }
        resolved
    }

    pub fn lecture_units(&self) -> &[UnitId] {
        &self.lecture_units
    }

    pub fn quiz_units(&self) -> &[UnitId] {
        &self.quiz_units
    }

    /// Σ over sections of (lectures + 1 if the section has a quiz)
    pub fn total_units(&self) -> usize {
        self.lecture_units.len() + self.quiz_units.len()
    }

    /// Whether `unit` is a lecture or quiz unit of this curriculum
    pub fn contains(&self, unit: &UnitId) -> bool {
        self.lecture_units.contains(unit) || self.quiz_units.contains(unit)
    }

    /// Lecture following `current` in document order
    pub fn next_lecture(&self, current: &UnitId) -> Option<&UnitId> {
        let pos = self.lecture_units.iter().position(|u| u == current)?;
        self.lecture_units.get(pos + 1)
    }

    /// Lecture preceding `current` in document order
    pub fn previous_lecture(&self, current: &UnitId) -> Option<&UnitId> {
        let pos = self.lecture_units.iter().position(|u| u == current)?;
        pos.checked_sub(1).and_then(|p| self.lecture_units.get(p))
    }

    /// A unit id that occurs more than once, lecture or quiz
    ///
    /// Completion is stored once per id, so a repeated id makes 100%
    /// unreachable.
    pub fn duplicate_unit(&self) -> Option<&UnitId> {
        let mut seen = HashSet::new();
        self.lecture_units
            .iter()
            .chain(&self.quiz_units)
            .find(|unit| !seen.insert(*unit))
    }

    /// First lecture not yet in `completed`
    pub fn first_incomplete_lecture(&self, completed: &BTreeSet<UnitId>) -> Option<&UnitId> {
        self.lecture_units.iter().find(|u| !completed.contains(*u))
    }
}

/// Total unit count of a curriculum
pub fn total_units(curriculum: &Curriculum) -> usize {
    ResolvedCurriculum::resolve(curriculum).total_units()
}

/// Reject a course whose curriculum repeats a unit id
pub fn check_unique_units(course: &Course) -> Result<()> {
    match ResolvedCurriculum::resolve(&course.curriculum).duplicate_unit() {
        Some(unit) => Err(EngineError::CorruptRecord(format!(
            "course '{}' lists unit '{}' more than once",
            course.id, unit
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Lecture, QuizQuestion, Section, SectionId};

    fn lecture(id: &str) -> Lecture {
        Lecture {
            id: UnitId::parse(id).unwrap(),
            duration: 60,
        }
    }

    fn question() -> QuizQuestion {
        QuizQuestion {
            question: "?".to_string(),
            options: vec!["a".to_string(), "b".to_string()],
            correct_option: 0,
        }
    }

    fn section(id: &str, lectures: &[&str], quiz: bool) -> Section {
        Section {
            id: SectionId::parse(id).unwrap(),
            title: id.to_uppercase(),
            lectures: lectures.iter().map(|l| lecture(l)).collect(),
            quiz: quiz.then(|| vec![question(), question()]),
        }
    }

    #[test]
    fn test_sections_with_and_without_quiz() {
        let curriculum = Curriculum::from_sections(vec![
            section("s1", &["l1", "l2"], true),
            section("s2", &["l3"], false),
        ]);
        let resolved = ResolvedCurriculum::resolve(&curriculum);

        assert_eq!(resolved.total_units(), 4);
        let ids: Vec<&str> = resolved.lecture_units().iter().map(|u| u.as_str()).collect();
        assert_eq!(ids, vec!["l1", "l2", "l3"]);
        assert_eq!(resolved.quiz_units()[0].as_str(), "quiz-s1");
    }

    #[test]
    fn test_quiz_only_section_counts_one() {
        let curriculum = Curriculum::from_sections(vec![section("exam", &[], true)]);
        assert_eq!(total_units(&curriculum), 1);
    }

    #[test]
    fn test_legacy_flat_lectures() {
        let curriculum = Curriculum::from_lectures(vec![lecture("a"), lecture("b"), lecture("c")]);
        let resolved = ResolvedCurriculum::resolve(&curriculum);
        assert_eq!(resolved.total_units(), 3);
        assert!(resolved.quiz_units().is_empty());
    }

    #[test]
    fn test_empty_curriculum() {
        assert_eq!(total_units(&Curriculum::default()), 0);
    }

    #[test]
    fn test_navigation() {
        let curriculum = Curriculum::from_sections(vec![
            section("s1", &["l1", "l2"], true),
            section("s2", &["l3"], false),
        ]);
        let resolved = ResolvedCurriculum::resolve(&curriculum);
        let l1 = UnitId::parse("l1").unwrap();
        let l2 = UnitId::parse("l2").unwrap();
        let l3 = UnitId::parse("l3").unwrap();

        assert_eq!(resolved.next_lecture(&l2), Some(&l3));
        assert_eq!(resolved.next_lecture(&l3), None);
        assert_eq!(resolved.previous_lecture(&l2), Some(&l1));
        assert_eq!(resolved.previous_lecture(&l1), None);

        let completed: BTreeSet<UnitId> = [l1.clone()].into_iter().collect();
        assert_eq!(resolved.first_incomplete_lecture(&completed), Some(&l2));
        assert!(resolved.contains(&UnitId::parse("quiz-s1").unwrap()));
        assert!(!resolved.contains(&UnitId::parse("quiz-s2").unwrap()));
    }

    #[test]
    fn test_duplicate_units_detected() {
        let unique = Curriculum::from_sections(vec![
            section("s1", &["l1", "l2"], true),
            section("s2", &["l3"], false),
        ]);
        assert!(ResolvedCurriculum::resolve(&unique).duplicate_unit().is_none());

        let repeated_lecture = Curriculum::from_sections(vec![
            section("s1", &["l1", "l2"], false),
            section("s2", &["l2"], false),
        ]);
        assert_eq!(
            ResolvedCurriculum::resolve(&repeated_lecture)
                .duplicate_unit()
                .map(|u| u.as_str()),
            Some("l2")
        );

        let shadowed_quiz = Curriculum::from_sections(vec![section("s1", &["quiz-s1"], true)]);
        assert_eq!(
            ResolvedCurriculum::resolve(&shadowed_quiz)
                .duplicate_unit()
                .map(|u| u.as_str()),
            Some("quiz-s1")
        );
    }

    #[test]
    fn test_check_unique_units_rejects_as_corrupt() {
        let course = Course {
            id: crate::domain::CourseId::parse("c1").unwrap(),
            title: "C1".to_string(),
            curriculum: Curriculum::from_lectures(vec![lecture("a"), lecture("a")]),
        };
        assert!(matches!(
            check_unique_units(&course),
            Err(EngineError::CorruptRecord(_))
        ));
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let curriculum = Curriculum::from_sections(vec![section("s1", &["l1", "l2"], true)]);
        assert_eq!(
            ResolvedCurriculum::resolve(&curriculum),
            ResolvedCurriculum::resolve(&curriculum)
        );
    }
}
