// cliprate/src/cli.rs
//
// Single source of truth for all CLI definitions (Clap structs).

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cliprate")]
#[command(about = "Operator toolbox for the video-clip survey", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 🩺 Checks the survey project (config, scales, videos, metadata)
    Check {
        /// Project directory
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,
    },

    /// 🎲 Simulates playlist sampling and shows the stratum balance
    Sample {
        /// Project directory
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,

        /// Number of simulated participants
        #[arg(long, short, default_value = "100")]
        participants: usize,

        /// RNG seed for a reproducible simulation
        #[arg(long)]
        seed: Option<u64>,

        /// Override the configured number_of_videos
        #[arg(long)]
        target: Option<usize>,
    },

    /// 📦 Exports collected data (CSV tables + raw-file backup)
    Export {
        /// Project directory
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,
    },

    /// 📊 Shows collection progress (participants, ratings per video)
    Stats {
        /// Project directory
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,
    },
}
