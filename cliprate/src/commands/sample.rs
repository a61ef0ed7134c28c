// cliprate/src/commands/sample.rs
//
// USE CASE: Dry-run the playlist sampler before any participant shows up.
// Simulates N participants against the current pool and prints how the
// selections distribute over the stratification levels, so a researcher can
// see whether the configured proportions actually hold with this pool.

use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::path::Path;

use cliprate_core::application::SurveySession;
use cliprate_core::domain::sampler;

pub async fn execute(
    project_dir: &Path,
    participants: usize,
    seed: Option<u64>,
    target: Option<usize>,
) -> anyhow::Result<()> {
    let session = SurveySession::open(project_dir)?;
    let config = &session.config;
    let target = target.or(config.settings.number_of_videos);

    let pool = session.eligible_pool().await?;
    println!(
        "🎲 Simulating {} participants over {} eligible videos...",
        participants,
        pool.len()
    );
    if pool.is_empty() {
        anyhow::bail!("❌ Eligible pool is empty. Run 'cliprate check' first.");
    }

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut picks_per_video: HashMap<String, usize> = HashMap::new();
    let mut playlist_sizes: Vec<usize> = Vec::new();
    for _ in 0..participants {
        let playlist = sampler::select(
            &pool,
            &session.metadata,
            target,
            &config.settings.variables_for_stratification,
            &mut rng,
        );
        playlist_sizes.push(playlist.len());
        for id in playlist {
            *picks_per_video.entry(id).or_insert(0) += 1;
        }
    }

    let total_picks: usize = picks_per_video.values().sum();
    let mean_size = playlist_sizes.iter().sum::<usize>() as f64 / participants as f64;
    println!("   Mean playlist size: {:.1}", mean_size);

    // --- STRATUM BALANCE ---
    for spec in &config.settings.variables_for_stratification {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL).set_header(vec![
            spec.variable.clone(),
            "expected".to_string(),
            "observed".to_string(),
            "picks".to_string(),
        ]);

        for (level, proportion) in spec.levels.iter().zip(&spec.proportions) {
            let picks: usize = picks_per_video
                .iter()
                .filter(|(id, _)| {
                    session
                        .metadata
                        .get(id)
                        .and_then(|row| row.get(&spec.variable))
                        .map(String::as_str)
                        == Some(level.as_str())
                })
                .map(|(_, n)| n)
                .sum();
            let observed = if total_picks == 0 {
                0.0
            } else {
                picks as f64 / total_picks as f64
            };
            table.add_row(vec![
                level.clone(),
                format!("{:.1}%", proportion * 100.0),
                format!("{:.1}%", observed * 100.0),
                picks.to_string(),
            ]);
        }
        println!("{table}");
    }

    // --- COVERAGE ---
    let untouched = pool
        .iter()
        .filter(|id| !picks_per_video.contains_key(*id))
        .count();
    if untouched > 0 {
        println!("⚠️  {} videos were never selected in this simulation", untouched);
    }
    println!("✨ Simulation done ({} total picks)", total_picks);
    Ok(())
}
