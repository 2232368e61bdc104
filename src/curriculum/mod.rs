//! Curriculum resolution and the course catalog collaborator

mod catalog;
mod resolver;

pub use catalog::{CurriculumSource, DirectoryCatalog, StaticCatalog};
pub use resolver::{ResolvedCurriculum, check_unique_units, total_units};
