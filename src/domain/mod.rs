//! Core domain types for course progress, badges and certificates

mod badge;
mod curriculum;
mod ids;
mod records;

pub use badge::{BadgeAward, BadgeDefinition, BadgeScope, MilestoneType};
pub use curriculum::{Course, Curriculum, CurriculumItem, Lecture, QuizQuestion, Section};
pub use ids::{BadgeId, CourseId, LearnerId, MAX_ID_LEN, RegistrationNumber, SectionId, UnitId};
pub use records::{Certificate, LearnerProgress};
