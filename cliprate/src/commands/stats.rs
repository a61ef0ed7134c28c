// cliprate/src/commands/stats.rs
//
// USE CASE: Collection progress at a glance: how many participants signed up
// and how close each video is to its saturation threshold.

use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;
use std::path::Path;

use cliprate_core::application::SurveySession;

pub async fn execute(project_dir: &Path) -> anyhow::Result<()> {
    let session = SurveySession::open(project_dir)?;
    let config = &session.config;

    let users = session.gateway.all_user_ids().await;
    let counts = session.gateway.rating_counts().await;
    let total_ratings: usize = counts.values().sum();
    let threshold = config.settings.min_ratings_per_video;

    println!("📊 Collection progress");
    println!("   Participants : {}", users.len());
    println!("   Ratings      : {}", total_ratings);
    println!("   Videos rated : {}", counts.len());

    let pool = session.scan_video_pool()?;
    let saturated = pool
        .iter()
        .filter(|id| threshold > 0 && counts.get(*id).copied().unwrap_or(0) >= threshold)
        .count();
    println!(
        "   Saturated    : {}/{} (threshold {})",
        saturated,
        pool.len(),
        threshold
    );

    if pool.is_empty() {
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["video", "ratings", "status"]);

    let mut rows: Vec<(&String, usize)> = pool
        .iter()
        .map(|id| (id, counts.get(id).copied().unwrap_or(0)))
        .collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    for (id, n) in rows {
        let status = if threshold > 0 && n >= threshold {
            "✅ saturated"
        } else {
            "⏳ collecting"
        };
        table.add_row(vec![id.clone(), n.to_string(), status.to_string()]);
    }
    println!("{table}");
    Ok(())
}
