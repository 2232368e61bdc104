//! coursetrack - course progress, badges and certificates
//!
//! Tracks which units of a course curriculum each learner has completed,
//! awards milestone badges as completion percentages rise, and issues one
//! completion certificate per learner and course once 100% is reached.
//!
//! ## Guarantees
//!
//! - The percentage is always derived from the stored completed-unit set.
//! - Badge awards and certificates are never removed, even when units are
//!   later marked incomplete.
//! - Concurrent completion events cannot create duplicate awards or
//!   certificates; uniqueness is enforced by the store at insert time.
//! - A certificate's registration number converges to the learner's
//!   identity record.

pub mod badges;
pub mod certificates;
pub mod config;
pub mod curriculum;
pub mod domain;
pub mod engine;
pub mod error;
pub mod quiz;
pub mod store;

pub use certificates::CertificateOutcome;
pub use domain::*;
pub use engine::{CompletionOutcome, ProgressEngine, ProgressSnapshot, QuizOutcome};
pub use error::{EngineError, Result};
