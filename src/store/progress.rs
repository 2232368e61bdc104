//! Authoritative per-learner, per-course completion record
//!
//! The completed-unit set is stored one row per unit, so marking a unit
//! complete or incomplete is a single-row insert or delete. Two concurrent
//! toggles of different units of the same course can never overwrite each
//! other the way a whole-record read-modify-write would.

use std::collections::BTreeSet;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use tracing::debug;

use super::db::ProgressDb;
use crate::domain::{CourseId, LearnerId, LearnerProgress, UnitId};
use crate::error::{EngineError, Result};

/// Completion percentage: `round(100 * completed / total)` clamped to 0..=100,
/// and 0 for an empty curriculum.
pub fn completion_percentage(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    // Integer round-half-up
    let pct = (200 * completed as u128 + total as u128) / (2 * total as u128);
    pct.min(100) as u8
}

/// Reads and mutates learner progress
#[derive(Clone)]
pub struct ProgressStore {
    db: ProgressDb,
}

impl ProgressStore {
    pub fn new(db: ProgressDb) -> Self {
        Self { db }
    }

    /// Completed units, empty if the learner never touched the course
    pub fn completed_units(&self, learner: &LearnerId, course: &CourseId) -> Result<BTreeSet<UnitId>> {
        let conn = self.db.conn()?;
        read_units(&conn, learner, course)
    }

    /// Full progress record, `None` before the first completion toggle
    pub fn progress(&self, learner: &LearnerId, course: &CourseId) -> Result<Option<LearnerProgress>> {
        let conn = self.db.conn()?;
        let last_activity_at: Option<i64> = conn
            .query_row(
                "SELECT last_activity_at FROM learner_progress WHERE learner = ?1 AND course = ?2",
                params![learner.as_str(), course.as_str()],
                |r| r.get(0),
            )
            .optional()?;

        let Some(last_activity_at) = last_activity_at else {
            return Ok(None);
        };

        Ok(Some(LearnerProgress {
            learner: learner.clone(),
            course: course.clone(),
            completed_units: read_units(&conn, learner, course)?,
            last_activity_at: Some(last_activity_at),
        }))
    }

    /// Add `unit` to (or remove it from) the completed set
    ///
    /// Creates the progress record on first use. The record upsert and the
    /// single-unit change commit together or not at all. Repeating the same
    /// call is a no-op apart from refreshing the activity timestamp.
    pub fn set_unit_completion(
        &self,
        learner: &LearnerId,
        course: &CourseId,
        unit: &UnitId,
        completed: bool,
    ) -> Result<BTreeSet<UnitId>> {
        let now = Utc::now().timestamp_millis();
        let mut conn = self.db.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute(
            r#"INSERT INTO learner_progress (learner, course, created_at, last_activity_at)
               VALUES (?1, ?2, ?3, ?3)
               ON CONFLICT(learner, course) DO UPDATE SET last_activity_at = excluded.last_activity_at"#,
            params![learner.as_str(), course.as_str(), now],
        )?;

        let changed = if completed {
            tx.execute(
                r#"INSERT OR IGNORE INTO completed_units (learner, course, unit_id, completed_at)
                   VALUES (?1, ?2, ?3, ?4)"#,
                params![learner.as_str(), course.as_str(), unit.as_str(), now],
            )?
        } else {
            tx.execute(
                "DELETE FROM completed_units WHERE learner = ?1 AND course = ?2 AND unit_id = ?3",
                params![learner.as_str(), course.as_str(), unit.as_str()],
            )?
        };

        let units = read_units(&tx, learner, course)?;
        tx.commit()?;

        debug!(
            learner = %learner,
            course = %course,
            unit = %unit,
            completed,
            changed = changed > 0,
            "unit completion set"
        );
        Ok(units)
    }

    /// Percentage recomputed from the current completed set on every call
    pub fn compute_percentage(
        &self,
        learner: &LearnerId,
        course: &CourseId,
        total_units: usize,
    ) -> Result<u8> {
        let conn = self.db.conn()?;
        let completed: i64 = conn.query_row(
            "SELECT COUNT(*) FROM completed_units WHERE learner = ?1 AND course = ?2",
            params![learner.as_str(), course.as_str()],
            |r| r.get(0),
        )?;
        Ok(completion_percentage(completed.max(0) as usize, total_units))
    }
}

fn read_units(conn: &Connection, learner: &LearnerId, course: &CourseId) -> Result<BTreeSet<UnitId>> {
    let mut stmt = conn.prepare(
        "SELECT unit_id FROM completed_units WHERE learner = ?1 AND course = ?2",
    )?;
    let raw: Vec<String> = stmt
        .query_map(params![learner.as_str(), course.as_str()], |row| row.get(0))?
        .collect::<rusqlite::Result<_>>()?;

    raw.into_iter()
        .map(|id| {
            UnitId::parse(id.clone())
                .map_err(|_| EngineError::CorruptRecord(format!("stored unit id '{}'", id)))
        })
        .collect()
}
