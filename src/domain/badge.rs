//! Badge definitions and awards

use serde::{Deserialize, Serialize};

use super::ids::{BadgeId, CourseId, LearnerId};
use crate::error::{EngineError, Result};

/// What a badge milestone measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MilestoneType {
    /// Course completion percentage
    #[default]
    Percentage,
}

impl MilestoneType {
    /// Get the string form used for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "percentage" => Some(Self::Percentage),
            _ => None,
        }
    }
}

/// Which courses can earn a badge
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeScope {
    /// Reaching the milestone in any single course qualifies
    All,
    /// Only progress in this course qualifies
    Course(CourseId),
}

impl BadgeScope {
    /// Whether progress in `course` can earn the badge
    pub fn covers(&self, course: &CourseId) -> bool {
        match self {
            Self::All => true,
            Self::Course(scoped) => scoped == course,
        }
    }

    /// Scoped course, `None` for `All`
    pub fn course(&self) -> Option<&CourseId> {
        match self {
            Self::All => None,
            Self::Course(course) => Some(course),
        }
    }
}

/// Administratively managed badge definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeDefinition {
    pub id: BadgeId,
    pub name: String,
    pub milestone_type: MilestoneType,
    /// Threshold in percent, 0..=100
    pub milestone_value: u8,
    pub scope: BadgeScope,
}

impl BadgeDefinition {
    pub fn new(
        id: BadgeId,
        name: impl Into<String>,
        milestone_type: MilestoneType,
        milestone_value: u8,
        scope: BadgeScope,
    ) -> Result<Self> {
        if milestone_value > 100 {
            return Err(EngineError::validation(
                "milestone_value",
                format!("{} is outside 0..=100", milestone_value),
            ));
        }
        Ok(Self {
            id,
            name: name.into(),
            milestone_type,
            milestone_value,
            scope,
        })
    }

    /// Shorthand for a percentage milestone badge
    pub fn percentage(id: BadgeId, name: impl Into<String>, value: u8, scope: BadgeScope) -> Result<Self> {
        Self::new(id, name, MilestoneType::Percentage, value, scope)
    }
}

/// A badge held by a learner. Never altered or removed once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeAward {
    pub learner: LearnerId,
    pub badge: BadgeId,
    /// Course whose progress earned the badge
    pub course: CourseId,
    /// Milliseconds since epoch
    pub awarded_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_milestone_value_bounds() {
        let id = BadgeId::parse("b").unwrap();
        assert!(BadgeDefinition::percentage(id.clone(), "ok", 100, BadgeScope::All).is_ok());
        assert!(matches!(
            BadgeDefinition::percentage(id, "too high", 101, BadgeScope::All),
            Err(EngineError::Validation { field: "milestone_value", .. })
        ));
    }

    #[test]
    fn test_scope_covers() {
        let a = CourseId::parse("a").unwrap();
        let b = CourseId::parse("b").unwrap();
        assert!(BadgeScope::All.covers(&a));
        assert!(BadgeScope::Course(a.clone()).covers(&a));
        assert!(!BadgeScope::Course(a).covers(&b));
    }

    #[test]
    fn test_milestone_type_roundtrip() {
        assert_eq!(MilestoneType::parse("percentage"), Some(MilestoneType::Percentage));
        assert_eq!(MilestoneType::parse("streak"), None);
    }
}
