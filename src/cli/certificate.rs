//! Registration and certificate commands

use anyhow::{Result, bail};

use coursetrack::{LearnerId, RegistrationNumber};

use super::{Context, print_certificate};

/// Assign a registration number to a learner
pub async fn register_command(ctx: &Context, learner: String, number: Option<String>) -> Result<()> {
    let learner = LearnerId::parse(learner)?;
    let requested = number.map(RegistrationNumber::parse).transpose()?;

    let identity = ctx.identity.clone();
    let assigned_to = learner.clone();
    let effective = ctx
        .engine
        .call(ctx.config.store.timeout(), move |_| match &requested {
            Some(number) => identity.assign(&assigned_to, number),
            None => identity.assign_generated(&assigned_to),
        })
        .await?;

    if ctx.print_json(&serde_json::json!({
        "learner": learner,
        "registration_number": effective,
    }))? {
        return Ok(());
    }

    println!("{}: {}", learner, effective);
    Ok(())
}

/// Show a learner's certificate for a course
pub async fn certificate_command(ctx: &Context, learner: String, course: String) -> Result<()> {
    let label = format!("{} in {}", learner, course);
    let certificate = ctx
        .engine
        .call(ctx.config.store.timeout(), move |engine| {
            engine.get_certificate(&learner, &course)
        })
        .await?;

    if ctx.print_json(&certificate)? {
        return Ok(());
    }

    match certificate {
        Some(cert) => print_certificate(&cert),
        None => println!("No certificate for {}", label),
    }
    Ok(())
}

/// Look up a certificate by its public number
pub async fn verify_command(ctx: &Context, certificate_id: String) -> Result<()> {
    let lookup = certificate_id.clone();
    let certificate = ctx
        .engine
        .call(ctx.config.store.timeout(), move |engine| {
            engine.verify_certificate(&lookup)
        })
        .await?;

    if ctx.print_json(&certificate)? {
        return Ok(());
    }

    match certificate {
        Some(cert) => print_certificate(&cert),
        None => bail!("Unknown certificate: {}", certificate_id),
    }
    Ok(())
}
