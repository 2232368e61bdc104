//! Badge administration commands

use anyhow::Result;
use clap::Subcommand;

use coursetrack::{BadgeDefinition, BadgeId, BadgeScope, CourseId};

use super::{Context, format_timestamp};

#[derive(Subcommand)]
pub enum BadgeCommands {
    /// Create or replace a percentage milestone badge
    Define {
        id: String,
        name: String,
        /// Completion percentage that earns the badge (0-100)
        value: u8,
        /// Limit the badge to one course (any course when omitted)
        #[arg(long)]
        course: Option<String>,
    },

    /// List badge definitions
    List,

    /// List badges a learner holds
    Held { learner: String },
}

pub async fn badge_command(ctx: &Context, command: BadgeCommands) -> Result<()> {
    let timeout = ctx.config.store.timeout();
    match command {
        BadgeCommands::Define {
            id,
            name,
            value,
            course,
        } => {
            let scope = match course {
                Some(course) => BadgeScope::Course(CourseId::parse(course)?),
                None => BadgeScope::All,
            };
            let definition = BadgeDefinition::percentage(BadgeId::parse(id)?, name, value, scope)?;
            let stored = definition.clone();
            ctx.engine
                .call(timeout, move |engine| engine.define_badge(&stored))
                .await?;

            if !ctx.print_json(&definition)? {
                println!("Defined badge {} at {}%", definition.id, definition.milestone_value);
            }
        }
        BadgeCommands::List => {
            let definitions = ctx
                .engine
                .call(timeout, |engine| engine.badge_definitions())
                .await?;
            if ctx.print_json(&definitions)? {
                return Ok(());
            }
            if definitions.is_empty() {
                println!("No badges defined.");
                return Ok(());
            }
            for def in definitions {
                let scope = match def.scope.course() {
                    Some(course) => course.to_string(),
                    None => "all courses".to_string(),
                };
                println!(
                    "  {:<20} {:>3}%  {} [{}]",
                    def.id, def.milestone_value, def.name, scope
                );
            }
        }
        BadgeCommands::Held { learner } => {
            let awards = ctx
                .engine
                .call(timeout, move |engine| engine.badges_for(&learner))
                .await?;
            if ctx.print_json(&awards)? {
                return Ok(());
            }
            if awards.is_empty() {
                println!("No badges yet.");
                return Ok(());
            }
            for award in awards {
                println!(
                    "  {:<20} {}  (earned in {})",
                    award.badge,
                    format_timestamp(award.awarded_at),
                    award.course
                );
            }
        }
    }
    Ok(())
}
