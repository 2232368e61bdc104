//! Course catalog collaborator
//!
//! The engine only reads curricula. `DirectoryCatalog` serves one JSON
//! document per course (`<dir>/<courseId>.json`), `StaticCatalog` keeps
//! courses in memory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use super::resolver::check_unique_units;
use crate::domain::{Course, CourseId};
use crate::error::{EngineError, Result};

/// Source of course curricula
pub trait CurriculumSource: Send + Sync {
    /// Look up a course, `None` if the catalog does not know it
    fn course(&self, id: &CourseId) -> Result<Option<Course>>;
}

/// Reads `<courseId>.json` files from a directory on every lookup
#[derive(Debug, Clone)]
pub struct DirectoryCatalog {
    dir: PathBuf,
}

impl DirectoryCatalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn course_path(&self, id: &CourseId) -> PathBuf {
        self.dir.join(format!("{}.json", id.as_str()))
    }
}

impl CurriculumSource for DirectoryCatalog {
    fn course(&self, id: &CourseId) -> Result<Option<Course>> {
        let path = self.course_path(id);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(EngineError::StorageUnavailable(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        let course: Course = serde_json::from_str(&content).map_err(|e| {
            EngineError::CorruptRecord(format!("{}: {}", path.display(), e))
        })?;
        if &course.id != id {
            return Err(EngineError::CorruptRecord(format!(
                "{} declares course '{}'",
                path.display(),
                course.id
            )));
        }
        check_unique_units(&course)?;
        Ok(Some(course))
    }
}

/// In-memory catalog
#[derive(Debug, Default)]
pub struct StaticCatalog {
    courses: RwLock<HashMap<CourseId, Course>>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a course
    pub fn insert(&self, course: Course) {
        let mut courses = self.courses.write().unwrap_or_else(|e| e.into_inner());
        courses.insert(course.id.clone(), course);
    }

    pub fn with_course(self, course: Course) -> Self {
        self.insert(course);
        self
    }
}

impl CurriculumSource for StaticCatalog {
    fn course(&self, id: &CourseId) -> Result<Option<Course>> {
        let courses = self.courses.read().unwrap_or_else(|e| e.into_inner());
        Ok(courses.get(id).cloned())
    }
}
