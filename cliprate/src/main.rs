// cliprate/src/main.rs
//
// Operator entry point. The survey itself runs behind a UI layer that drives
// `SurveySession`; this binary covers everything around collection: project
// checks, sampling dry-runs, data export and progress stats.

use clap::Parser;

mod cli;
mod commands;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG=debug cliprate check ... pour voir les détails
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        // --- USE CASE: PRE-FLIGHT CHECK ---
        Commands::Check { project_dir } => match commands::check::execute(&project_dir) {
            Ok(true) => {}
            Ok(false) => std::process::exit(1),
            Err(e) => {
                eprintln!("💥 Check failed: {}", e);
                std::process::exit(1);
            }
        },

        // --- USE CASE: SAMPLING DRY-RUN ---
        Commands::Sample {
            project_dir,
            participants,
            seed,
            target,
        } => {
            if let Err(e) =
                commands::sample::execute(&project_dir, participants, seed, target).await
            {
                eprintln!("❌ Sampling simulation failed: {}", e);
                std::process::exit(1);
            }
        }

        // --- USE CASE: DATA EXPORT ---
        Commands::Export { project_dir } => {
            if let Err(e) = commands::export::execute(&project_dir) {
                eprintln!("❌ Export failed: {}", e);
                std::process::exit(1);
            }
        }

        // --- USE CASE: PROGRESS STATS ---
        Commands::Stats { project_dir } => {
            if let Err(e) = commands::stats::execute(&project_dir).await {
                eprintln!("❌ Stats failed: {}", e);
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
