// cliprate/src/commands/check.rs
//
// USE CASE: Pre-flight check of a survey project before opening it to
// participants. Loads everything the session would load and reports what a
// misconfigured study would only reveal mid-collection.

use std::path::Path;

use cliprate_core::application::SurveySession;

pub fn execute(project_dir: &Path) -> anyhow::Result<bool> {
    println!("🩺 Checking survey project '{}'...", project_dir.display());

    // Loading alone already validates config.yaml and both satellite files.
    let session = SurveySession::open(project_dir)?;
    let config = &session.config;
    let mut problems: Vec<String> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();

    println!("   Storage mode: {:?}", config.settings.storage_mode);
    println!(
        "   Display: metadata={}, pitch={}, playback mode '{}'",
        config.settings.display_metadata,
        config.settings.display_pitch,
        config.settings.video_playback_mode
    );

    // --- VIDEOS ---
    let pool = session.scan_video_pool()?;
    if pool.is_empty() {
        problems.push(format!(
            "No .mp4 files found in '{}'",
            config.paths.video_path
        ));
    } else {
        println!("   Videos: {} in '{}'", pool.len(), config.paths.video_path);
    }

    if let Some(target) = config.settings.number_of_videos {
        if target > pool.len() {
            warnings.push(format!(
                "number_of_videos ({}) exceeds the pool ({} videos)",
                target,
                pool.len()
            ));
        }
    }

    // --- SCALES ---
    if session.scales.scales.is_empty() {
        warnings.push("No active rating scales configured".to_string());
    } else {
        println!("   Rating scales: {} active", session.scales.scales.len());
    }
    for group in &session.scales.groups {
        if session.scales.scales_in_group(&group.id).is_empty() {
            warnings.push(format!("Group '{}' has no active member scales", group.id));
        }
    }

    // --- QUESTIONNAIRE ---
    println!("   Questionnaire: {} active fields", session.questionnaire.len());

    // --- METADATA ---
    if config.paths.metadata_path.is_some() && session.metadata.is_empty() {
        warnings.push("Metadata file configured but no rows were loaded".to_string());
    }
    if !session.metadata.is_empty() {
        println!("   Metadata: {} rows", session.metadata.len());

        let known: Vec<String> = session.metadata.ids();
        let orphans = pool.iter().filter(|id| !known.contains(id)).count();
        if orphans > 0 {
            warnings.push(format!("{} videos have no metadata row", orphans));
        }

        if !session.metadata.has_column(&config.settings.outcome_column) {
            warnings.push(format!(
                "Outcome column '{}' not found in metadata",
                config.settings.outcome_column
            ));
        }

        if config.settings.display_metadata {
            for field in &config.settings.metadata_to_show {
                if !session.metadata.has_column(&field.column) {
                    warnings.push(format!(
                        "Display column '{}' ({}) not found in metadata",
                        field.column, field.label
                    ));
                }
            }
        }
    }

    // --- STRATIFICATION ---
    for spec in &config.settings.variables_for_stratification {
        if !session.metadata.has_column(&spec.variable) {
            problems.push(format!(
                "Stratification variable '{}' not found in metadata",
                spec.variable
            ));
            continue;
        }
        if spec.levels.len() != spec.proportions.len() {
            problems.push(format!(
                "Variable '{}': {} levels but {} proportions",
                spec.variable,
                spec.levels.len(),
                spec.proportions.len()
            ));
        }
        let sum: f64 = spec.proportions.iter().sum();
        if (sum - 1.0).abs() > 0.01 {
            warnings.push(format!(
                "Variable '{}': proportions sum to {:.3}, not 1.0",
                spec.variable, sum
            ));
        }
    }

    // --- VERDICT ---
    for warning in &warnings {
        println!("⚠️  {}", warning);
    }
    for problem in &problems {
        println!("❌ {}", problem);
    }

    if problems.is_empty() {
        println!("✅ Project is ready ({} warnings)", warnings.len());
        Ok(true)
    } else {
        println!("💥 {} blocking problems found", problems.len());
        Ok(false)
    }
}
