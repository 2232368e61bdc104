//! Milestone badge evaluation
//!
//! The "already held" check below only filters out obvious repeats. It can be
//! stale by the time we write, so the award itself is a conditional insert
//! and a lost race is treated as "already awarded".

use std::collections::HashSet;

use chrono::Utc;
use tracing::{debug, info};

use crate::domain::{BadgeAward, BadgeDefinition, BadgeId, CourseId, LearnerId, MilestoneType};
use crate::error::Result;
use crate::store::{BadgeRepository, InsertOutcome};

/// Definitions the learner qualifies for and does not hold yet
///
/// An `all`-scoped badge qualifies on the percentage of any single course.
pub fn eligible_badges<'a>(
    course: &CourseId,
    percentage: u8,
    definitions: &'a [BadgeDefinition],
    held: &HashSet<BadgeId>,
) -> Vec<&'a BadgeDefinition> {
    definitions
        .iter()
        .filter(|def| !held.contains(&def.id))
        .filter(|def| def.scope.covers(course))
        .filter(|def| match def.milestone_type {
            MilestoneType::Percentage => percentage >= def.milestone_value,
        })
        .collect()
}

/// Awards badges for a learner's current course percentage
#[derive(Clone)]
pub struct BadgeEvaluator {
    repo: BadgeRepository,
}

impl BadgeEvaluator {
    pub fn new(repo: BadgeRepository) -> Self {
        Self { repo }
    }

    /// Award every newly earned badge and return the definitions this call awarded
    ///
    /// Definitions are read fresh on every call so administrative edits take
    /// effect immediately.
    pub fn evaluate(
        &self,
        learner: &LearnerId,
        course: &CourseId,
        percentage: u8,
    ) -> Result<Vec<BadgeDefinition>> {
        let definitions = self.repo.definitions()?;
        let held: HashSet<BadgeId> = self
            .repo
            .awards_for(learner)?
            .into_iter()
            .map(|award| award.badge)
            .collect();

        let mut newly_awarded = Vec::new();
        for def in eligible_badges(course, percentage, &definitions, &held) {
            let award = BadgeAward {
                learner: learner.clone(),
                badge: def.id.clone(),
                course: course.clone(),
                awarded_at: Utc::now().timestamp_millis(),
            };
            match self.repo.insert_award(&award)? {
                InsertOutcome::Inserted => {
                    info!(learner = %learner, course = %course, badge = %def.id, "badge awarded");
                    newly_awarded.push(def.clone());
                }
                InsertOutcome::Conflict => {
                    debug!(learner = %learner, badge = %def.id, "badge already awarded concurrently");
                }
            }
        }

        Ok(newly_awarded)
    }
}
