//! Badge definitions and awards

use chrono::Utc;
use rusqlite::{OptionalExtension, Row, params};

use super::InsertOutcome;
use super::db::ProgressDb;
use crate::domain::{BadgeAward, BadgeDefinition, BadgeId, BadgeScope, CourseId, LearnerId, MilestoneType};
use crate::error::{EngineError, Result};

/// Repository for badge definitions and awards
///
/// Awards have no update or delete path; the table triggers reject both.
#[derive(Clone)]
pub struct BadgeRepository {
    db: ProgressDb,
}

impl BadgeRepository {
    pub fn new(db: ProgressDb) -> Self {
        Self { db }
    }

    /// Create or replace a badge definition
    pub fn upsert_definition(&self, def: &BadgeDefinition) -> Result<()> {
        let now = Utc::now().timestamp_millis();
        let conn = self.db.conn()?;
        conn.execute(
            r#"INSERT INTO badge_definitions (id, name, milestone_type, milestone_value, scope_course, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6)
               ON CONFLICT(id) DO UPDATE SET
                   name = ?2, milestone_type = ?3, milestone_value = ?4, scope_course = ?5, updated_at = ?6"#,
            params![
                def.id.as_str(),
                def.name,
                def.milestone_type.as_str(),
                def.milestone_value,
                def.scope.course().map(|c| c.as_str()),
                now,
            ],
        )?;
        Ok(())
    }

    /// All badge definitions, read fresh from the store
    pub fn definitions(&self) -> Result<Vec<BadgeDefinition>> {
        let conn = self.db.conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT id, name, milestone_type, milestone_value, scope_course
               FROM badge_definitions ORDER BY milestone_value, id"#,
        )?;
        let rows: Vec<RawDefinition> = stmt
            .query_map([], RawDefinition::from_row)?
            .collect::<rusqlite::Result<_>>()?;
        rows.into_iter().map(RawDefinition::into_definition).collect()
    }

    /// A single badge definition
    pub fn definition(&self, id: &BadgeId) -> Result<Option<BadgeDefinition>> {
        let conn = self.db.conn()?;
        let raw = conn
            .query_row(
                r#"SELECT id, name, milestone_type, milestone_value, scope_course
                   FROM badge_definitions WHERE id = ?1"#,
                params![id.as_str()],
                RawDefinition::from_row,
            )
            .optional()?;
        raw.map(RawDefinition::into_definition).transpose()
    }

    /// Badges held by a learner, oldest first
    pub fn awards_for(&self, learner: &LearnerId) -> Result<Vec<BadgeAward>> {
        let conn = self.db.conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT badge_id, course, awarded_at FROM badge_awards
               WHERE learner = ?1 ORDER BY awarded_at, badge_id"#,
        )?;
        let rows: Vec<(String, String, i64)> = stmt
            .query_map(params![learner.as_str()], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))?
            .collect::<rusqlite::Result<_>>()?;

        rows.into_iter()
            .map(|(badge, course, awarded_at)| {
                Ok(BadgeAward {
                    learner: learner.clone(),
                    badge: BadgeId::parse(badge).map_err(corrupt("badge id"))?,
                    course: CourseId::parse(course).map_err(corrupt("course id"))?,
                    awarded_at,
                })
            })
            .collect()
    }

    /// Insert an award unless (learner, badge) already exists
    ///
    /// The primary key decides the race: of any number of concurrent callers,
    /// exactly one gets `Inserted`.
    pub fn insert_award(&self, award: &BadgeAward) -> Result<InsertOutcome> {
        let conn = self.db.conn()?;
        let changed = conn.execute(
            r#"INSERT OR IGNORE INTO badge_awards (learner, badge_id, course, awarded_at)
               VALUES (?1, ?2, ?3, ?4)"#,
            params![
                award.learner.as_str(),
                award.badge.as_str(),
                award.course.as_str(),
                award.awarded_at,
            ],
        )?;
        Ok(InsertOutcome::from_changes(changed))
    }
}

struct RawDefinition {
    id: String,
    name: String,
    milestone_type: String,
    milestone_value: i64,
    scope_course: Option<String>,
}

impl RawDefinition {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            milestone_type: row.get(2)?,
            milestone_value: row.get(3)?,
            scope_course: row.get(4)?,
        })
    }

    fn into_definition(self) -> Result<BadgeDefinition> {
        let milestone_type = MilestoneType::parse(&self.milestone_type).ok_or_else(|| {
            EngineError::CorruptRecord(format!(
                "badge '{}' has unknown milestone type '{}'",
                self.id, self.milestone_type
            ))
        })?;
        let milestone_value = u8::try_from(self.milestone_value).map_err(|_| {
            EngineError::CorruptRecord(format!(
                "badge '{}' has milestone value {}",
                self.id, self.milestone_value
            ))
        })?;
        let scope = match self.scope_course {
            None => BadgeScope::All,
            Some(course) => BadgeScope::Course(CourseId::parse(course).map_err(corrupt("course id"))?),
        };
        BadgeDefinition::new(
            BadgeId::parse(self.id).map_err(corrupt("badge id"))?,
            self.name,
            milestone_type,
            milestone_value,
            scope,
        )
    }
}

fn corrupt(what: &'static str) -> impl Fn(EngineError) -> EngineError {
    move |e| EngineError::CorruptRecord(format!("stored {}: {}", what, e))
}
