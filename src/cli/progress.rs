//! Completion, quiz and progress commands

use anyhow::Result;

use coursetrack::quiz::QuizAnswers;
use coursetrack::{BadgeDefinition, Certificate};

use super::{Context, format_timestamp, print_certificate};

/// Parse a `QUESTION=OPTION` quiz answer
pub fn parse_answer(s: &str) -> Result<(usize, usize), String> {
    let (question, option) = s
        .split_once('=')
        .ok_or_else(|| format!("expected QUESTION=OPTION, got '{}'", s))?;
    let question = question
        .trim()
        .parse()
        .map_err(|_| format!("invalid question index '{}'", question.trim()))?;
    let option = option
        .trim()
        .parse()
        .map_err(|_| format!("invalid option index '{}'", option.trim()))?;
    Ok((question, option))
}

/// Mark a unit complete or incomplete
pub async fn completion_command(
    ctx: &Context,
    learner: String,
    course: String,
    unit: String,
    completed: bool,
) -> Result<()> {
    let outcome = ctx
        .engine
        .call(ctx.config.store.timeout(), move |engine| {
            engine.submit_unit_completion(&learner, &course, &unit, completed)
        })
        .await?;

    if ctx.print_json(&outcome)? {
        return Ok(());
    }

    println!("Progress: {}%", outcome.percentage);
    print_rewards(
        &outcome.new_badges,
        outcome.certificate.as_ref(),
        outcome.awaiting_registration,
    );
    Ok(())
}

/// Grade quiz answers for a section
pub async fn quiz_command(
    ctx: &Context,
    learner: String,
    course: String,
    section: String,
    answers: Vec<(usize, usize)>,
) -> Result<()> {
    // Later answers to the same question win
    let answers: QuizAnswers = answers.into_iter().collect();
    let outcome = ctx
        .engine
        .call(ctx.config.store.timeout(), move |engine| {
            engine.submit_quiz_answers(&learner, &course, &section, &answers)
        })
        .await?;

    if ctx.print_json(&outcome)? {
        return Ok(());
    }

    println!(
        "Score: {}% ({}/{} correct) - {}",
        outcome.score,
        outcome.grade.correct_count,
        outcome.grade.total_questions,
        if outcome.passed { "passed" } else { "failed" }
    );
    println!("Progress: {}%", outcome.percentage);
    print_rewards(
        &outcome.new_badges,
        outcome.certificate.as_ref(),
        outcome.awaiting_registration,
    );
    Ok(())
}

/// Show a learner's progress in a course
pub async fn progress_command(ctx: &Context, learner: String, course: String) -> Result<()> {
    let snapshot = ctx
        .engine
        .call(ctx.config.store.timeout(), move |engine| {
            engine.get_progress(&learner, &course)
        })
        .await?;

    if ctx.print_json(&snapshot)? {
        return Ok(());
    }

    println!("{} in {}", snapshot.learner, snapshot.course);
    println!(
        "  Completed: {}/{} units ({}%)",
        snapshot.completed_units, snapshot.total_units, snapshot.percentage
    );
    if let Some(at) = snapshot.last_activity_at {
        println!("  Last activity: {}", format_timestamp(at));
    }
    match &snapshot.next_lecture {
        Some(next) => println!("  Next lecture: {}", next),
        None if snapshot.total_units > 0 => println!("  All lectures done"),
        None => {}
    }
    Ok(())
}

fn print_rewards(new_badges: &[BadgeDefinition], certificate: Option<&Certificate>, awaiting: bool) {
    for badge in new_badges {
        println!("New badge: {} ({})", badge.name, badge.id);
    }
    if let Some(cert) = certificate {
        print_certificate(cert);
    }
    if awaiting {
        println!("Course finished. Certificate will be issued once a registration number is assigned.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_answer() {
        assert_eq!(parse_answer("0=2"), Ok((0, 2)));
        assert_eq!(parse_answer(" 3 = 1 "), Ok((3, 1)));
        assert!(parse_answer("3").is_err());
        assert!(parse_answer("a=1").is_err());
        assert!(parse_answer("1=-1").is_err());
    }
}
