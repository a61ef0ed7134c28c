// cliprate/src/commands/export.rs
//
// USE CASE: Flatten the collected JSON records into researcher-friendly CSV
// tables and snapshot the raw files.

use std::path::Path;

use cliprate_core::application::export_all;
use cliprate_core::infrastructure::config::{load_config, load_rating_scales};

pub fn execute(project_dir: &Path) -> anyhow::Result<()> {
    println!("📦 Exporting survey data from '{}'...", project_dir.display());

    let config = load_config(project_dir)?;
    let scales = load_rating_scales(project_dir, &config)?;

    let summary = export_all(project_dir, &config, &scales)?;

    println!("   Ratings exported : {}", summary.ratings_rows);
    println!("   Users exported   : {}", summary.users_rows);
    println!("   Videos aggregated: {}", summary.aggregated_videos);
    println!("   Files backed up  : {}", summary.backed_up_files);
    println!("✨ Export written to '{}'", summary.output_dir.display());
    Ok(())
}
