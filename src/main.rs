use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "coursetrack")]
#[command(about = "Course progress, milestone badges and completion certificates")]
#[command(version)]
struct Cli {
    /// Path to the config file (defaults to ~/.coursetrack/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default ~/.coursetrack/config.toml
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },

    /// Assign a registration number to a learner (once)
    Register {
        learner: String,
        /// Registration number to assign (generated when omitted)
        #[arg(long)]
        number: Option<String>,
    },

    /// Mark a unit complete
    Complete {
        learner: String,
        course: String,
        unit: String,
    },

    /// Mark a unit incomplete
    Uncomplete {
        learner: String,
        course: String,
        unit: String,
    },

    /// Submit quiz answers for a section
    Quiz {
        learner: String,
        course: String,
        section: String,
        /// Answer as QUESTION=OPTION (zero-based), repeatable
        #[arg(short, long = "answer", value_parser = cli::progress::parse_answer)]
        answers: Vec<(usize, usize)>,
    },

    /// Show a learner's progress in a course
    Progress { learner: String, course: String },

    /// Show (and repair if needed) a learner's certificate for a course
    Certificate { learner: String, course: String },

    /// Look up a certificate by its number
    Verify { certificate_id: String },

    /// Badge administration and listings
    Badge {
        #[command(subcommand)]
        command: cli::badge::BadgeCommands,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();
    let ctx = || cli::Context::load(config_path, cli.json);

    match cli.command {
        Commands::Init { force } => {
            cli::init::init_command(config_path, force)?;
        }
        Commands::Register { learner, number } => {
            cli::certificate::register_command(&ctx()?, learner, number).await?;
        }
        Commands::Complete {
            learner,
            course,
            unit,
        } => {
            cli::progress::completion_command(&ctx()?, learner, course, unit, true).await?;
        }
        Commands::Uncomplete {
            learner,
            course,
            unit,
        } => {
            cli::progress::completion_command(&ctx()?, learner, course, unit, false).await?;
        }
        Commands::Quiz {
            learner,
            course,
            section,
            answers,
        } => {
            cli::progress::quiz_command(&ctx()?, learner, course, section, answers).await?;
        }
        Commands::Progress { learner, course } => {
            cli::progress::progress_command(&ctx()?, learner, course).await?;
        }
        Commands::Certificate { learner, course } => {
            cli::certificate::certificate_command(&ctx()?, learner, course).await?;
        }
        Commands::Verify { certificate_id } => {
            cli::certificate::verify_command(&ctx()?, certificate_id).await?;
        }
        Commands::Badge { command } => {
            cli::badge::badge_command(&ctx()?, command).await?;
        }
    }

    Ok(())
}
