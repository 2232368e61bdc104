//! Curriculum shape as delivered by the course catalog

use serde::{Deserialize, Deserializer, Serialize};

use super::ids::{CourseId, SectionId, UnitId};

/// A single lecture (one progress unit)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lecture {
    pub id: UnitId,
    /// Duration in seconds
    #[serde(default)]
    pub duration: u32,
}

/// One multiple choice question of a section quiz
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    /// Index into `options`
    pub correct_option: usize,
}

/// A titled group of lectures with an optional quiz
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: SectionId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub lectures: Vec<Lecture>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz: Option<Vec<QuizQuestion>>,
}

impl Section {
    /// The quiz, if the section has at least one question
    pub fn quiz(&self) -> Option<&[QuizQuestion]> {
        self.quiz.as_deref().filter(|q| !q.is_empty())
    }

    /// Synthetic unit completed by passing this section's quiz
    pub fn quiz_unit(&self) -> Option<UnitId> {
        self.quiz().map(|_| UnitId::quiz_for(&self.id))
    }
}

/// One top-level curriculum entry
///
/// Legacy courses list lectures without any section; each of those is a
/// `StandaloneLecture` and behaves like a lecture in a quiz-less section.
///
/// Serialized with a `type` tag. Deserialization also accepts catalog
/// documents without a tag: an object with a `lectures` list is a section,
/// anything else with an `id` is a standalone lecture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CurriculumItem {
    Section(Section),
    StandaloneLecture(Lecture),
}

impl<'de> Deserialize<'de> for CurriculumItem {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        WireItem::deserialize(deserializer).map(Self::from)
    }
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum TaggedItem {
    Section(Section),
    StandaloneLecture(Lecture),
}

/// Section as catalogs send it; `lectures` is required so that a bare
/// lecture object never reads as an empty section
#[derive(Deserialize)]
struct UntaggedSection {
    id: SectionId,
    #[serde(default)]
    title: String,
    lectures: Vec<Lecture>,
    #[serde(default)]
    quiz: Option<Vec<QuizQuestion>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireItem {
    Tagged(TaggedItem),
    Section(UntaggedSection),
    Lecture(Lecture),
}

impl From<WireItem> for CurriculumItem {
    fn from(wire: WireItem) -> Self {
        match wire {
            WireItem::Tagged(TaggedItem::Section(section)) => Self::Section(section),
            WireItem::Tagged(TaggedItem::StandaloneLecture(lecture)) => {
                Self::StandaloneLecture(lecture)
            }
            WireItem::Section(s) => Self::Section(Section {
                id: s.id,
                title: s.title,
                lectures: s.lectures,
                quiz: s.quiz,
            }),
            WireItem::Lecture(lecture) => Self::StandaloneLecture(lecture),
        }
    }
}

/// Ordered curriculum of a course
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Curriculum {
    items: Vec<CurriculumItem>,
}

impl Curriculum {
    pub fn new(items: Vec<CurriculumItem>) -> Self {
        Self { items }
    }

    /// Curriculum made only of sections
    pub fn from_sections(sections: Vec<Section>) -> Self {
        Self::new(sections.into_iter().map(CurriculumItem::Section).collect())
    }

    /// Legacy curriculum: a flat lecture list with no sections
    pub fn from_lectures(lectures: Vec<Lecture>) -> Self {
        Self::new(
            lectures
                .into_iter()
                .map(CurriculumItem::StandaloneLecture)
                .collect(),
        )
    }

    pub fn items(&self) -> &[CurriculumItem] {
        &self.items
    }

    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.items.iter().filter_map(|item| match item {
            CurriculumItem::Section(section) => Some(section),
            CurriculumItem::StandaloneLecture(_) => None,
        })
    }

    pub fn section(&self, id: &SectionId) -> Option<&Section> {
        self.sections().find(|s| &s.id == id)
    }
}

/// A course as served by the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub title: String,
    #[serde(default)]
    pub curriculum: Curriculum,
}
