// cliprate-core/src/application/export.rs
//
// Researcher-facing data egress. Reads the local JSON stores, flattens them
// into CSV tables under the output directory and snapshots the raw files into
// a timestamped backup folder. The SQL engine does the heavy lifting:
// union_by_name absorbs records whose scale sets drifted over the study.

use chrono::Local;
use duckdb::Connection;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{info, instrument, warn};

use crate::domain::rating::snake_case_key;
use crate::domain::scale::{ScaleKind, ScaleSet};
use crate::error::ClipRateError;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::error::InfrastructureError;
use crate::infrastructure::fs::{atomic_write, list_json_files};

#[derive(Debug, Default)]
pub struct ExportSummary {
    pub output_dir: PathBuf,
    pub ratings_rows: usize,
    pub users_rows: usize,
    pub aggregated_videos: usize,
    pub backed_up_files: usize,
}

/// Run the full export: ratings.csv, users.csv, mean_ratings.csv,
/// rating_log.txt and the raw-file backup.
#[instrument(skip_all)]
pub fn export_all(
    project_dir: &Path,
    config: &AppConfig,
    scales: &ScaleSet,
) -> Result<ExportSummary, ClipRateError> {
    let ratings_dir = safe_join(project_dir, &config.paths.ratings_path)?;
    let users_dir = safe_join(project_dir, &config.paths.user_data_path)?;
    let output_dir = safe_join(project_dir, &config.paths.output_path)?;
    let backup_dir = safe_join(project_dir, &config.paths.backup_path)?;

    fs::create_dir_all(&output_dir).map_err(InfrastructureError::Io)?;

    let conn = Connection::open_in_memory().map_err(InfrastructureError::from)?;
    let mut summary = ExportSummary {
        output_dir: output_dir.clone(),
        ..Default::default()
    };

    // --- RATINGS ---
    if json_view(&conn, "ratings", &ratings_dir)? {
        summary.ratings_rows = row_count(&conn, "ratings")?;
        copy_csv(
            &conn,
            "SELECT * FROM ratings ORDER BY user_id, id",
            &output_dir.join("ratings.csv"),
        )?;
        summary.aggregated_videos = export_means(&conn, scales, &output_dir)?;
        export_rating_log(&conn, &output_dir)?;
    } else {
        warn!(dir = ?ratings_dir, "No rating files to export");
    }

    // --- USERS ---
    if json_view(&conn, "users", &users_dir)? {
        summary.users_rows = row_count(&conn, "users")?;
        copy_csv(
            &conn,
            "SELECT * FROM users ORDER BY user_id",
            &output_dir.join("users.csv"),
        )?;
    } else {
        warn!(dir = ?users_dir, "No user files to export");
    }

    // --- BACKUP ---
    let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    for (label, dir) in [("user_data", &users_dir), ("user_ratings", &ratings_dir)] {
        summary.backed_up_files +=
            snapshot_files(dir, &backup_dir.join(&stamp).join(label))?;
    }

    info!(
        ratings = summary.ratings_rows,
        users = summary.users_rows,
        backed_up = summary.backed_up_files,
        "Export finished"
    );
    Ok(summary)
}

/// Reject configured paths that escape the project directory.
pub fn safe_join(project_dir: &Path, relative: &str) -> Result<PathBuf, ClipRateError> {
    let rel = Path::new(relative);
    let escapes = rel.is_absolute()
        || rel
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)));
    if escapes {
        return Err(ClipRateError::UnsafePath(relative.to_string()));
    }
    Ok(project_dir.join(rel))
}

/// Create a view over every JSON file in `dir`. False when the directory
/// holds nothing to read.
fn json_view(conn: &Connection, name: &str, dir: &Path) -> Result<bool, ClipRateError> {
    if list_json_files(dir)
        .map_err(ClipRateError::Infrastructure)?
        .is_empty()
    {
        return Ok(false);
    }

    let glob = dir.join("*.json");
    let sql = format!(
        "CREATE VIEW {} AS SELECT * FROM read_json_auto({}, union_by_name=true)",
        quote_ident(name),
        quote_str(&glob.to_string_lossy())
    );
    conn.execute(&sql, []).map_err(InfrastructureError::from)?;
    Ok(true)
}

fn row_count(conn: &Connection, view: &str) -> Result<usize, ClipRateError> {
    let sql = format!("SELECT count(*) FROM {}", quote_ident(view));
    let count: u64 = conn
        .query_row(&sql, [], |row| row.get(0))
        .map_err(InfrastructureError::from)?;
    Ok(count as usize)
}

fn copy_csv(conn: &Connection, select: &str, target: &Path) -> Result<(), ClipRateError> {
    let sql = format!(
        "COPY ({}) TO {} (HEADER, DELIMITER ',')",
        select,
        quote_str(&target.to_string_lossy())
    );
    conn.execute(&sql, []).map_err(InfrastructureError::from)?;
    info!(file = %target.display(), "CSV written");
    Ok(())
}

/// mean_ratings.csv: one row per video with the rating count plus
/// mean/std per numeric scale, rounded to 3 decimals. Returns the number
/// of aggregated videos.
fn export_means(
    conn: &Connection,
    scales: &ScaleSet,
    output_dir: &Path,
) -> Result<usize, ClipRateError> {
    let mut select = vec![
        "id".to_string(),
        "count(*) AS num_ratings".to_string(),
    ];

    let present = view_columns(conn, "ratings")?;
    for scale in numeric_scales(scales) {
        let column = snake_case_key(&scale.title);
        if !present.contains(&column) {
            warn!(column = %column, "Scale column absent from rating data, skipping aggregate");
            continue;
        }
        let cast = format!("TRY_CAST({} AS DOUBLE)", quote_ident(&column));
        select.push(format!(
            "round(avg({}), 3) AS {}",
            cast,
            quote_ident(&format!("mean_{}", column))
        ));
        select.push(format!(
            "round(stddev_samp({}), 3) AS {}",
            cast,
            quote_ident(&format!("std_{}", column))
        ));
    }

    let sql = format!(
        "SELECT {} FROM ratings WHERE id IS NOT NULL GROUP BY id ORDER BY id",
        select.join(", ")
    );
    copy_csv(conn, &sql, &output_dir.join("mean_ratings.csv"))?;

    let videos: u64 = conn
        .query_row(
            "SELECT count(DISTINCT id) FROM ratings WHERE id IS NOT NULL",
            [],
            |row| row.get(0),
        )
        .map_err(InfrastructureError::from)?;
    Ok(videos as usize)
}

/// rating_log.txt: human-readable saturation overview for the operator.
fn export_rating_log(conn: &Connection, output_dir: &Path) -> Result<(), ClipRateError> {
    let mut stmt = conn
        .prepare(
            "SELECT id, count(*) AS n FROM ratings WHERE id IS NOT NULL
             GROUP BY id ORDER BY n DESC, id",
        )
        .map_err(InfrastructureError::from)?;
    let rows: Vec<(String, u64)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .map_err(InfrastructureError::from)?
        .collect::<Result<_, _>>()
        .map_err(InfrastructureError::from)?;

    let raters: u64 = conn
        .query_row(
            "SELECT count(DISTINCT user_id) FROM ratings WHERE user_id IS NOT NULL",
            [],
            |row| row.get(0),
        )
        .map_err(InfrastructureError::from)?;

    let total: u64 = rows.iter().map(|(_, n)| n).sum();
    let mut log = format!(
        "Rating log ({})\nTotal ratings: {}\nVideos rated: {}\nRaters: {}\n",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        total,
        rows.len(),
        raters
    );

    // Frequency distribution: how many videos sit at each rating count.
    let mut distribution: BTreeMap<u64, usize> = BTreeMap::new();
    for (_, n) in &rows {
        *distribution.entry(*n).or_insert(0) += 1;
    }
    log.push_str("\nDistribution:\n");
    for (count, videos) in distribution.iter().rev() {
        log.push_str(&format!("  {} rating(s): {} video(s)\n", count, videos));
    }

    log.push_str("\nPer video:\n");
    for (id, n) in &rows {
        log.push_str(&format!("{:>5}  {}\n", n, id));
    }

    atomic_write(output_dir.join("rating_log.txt"), log)
        .map_err(ClipRateError::Infrastructure)?;
    Ok(())
}

/// Copy every JSON file from `source` into `target`, creating it.
fn snapshot_files(source: &Path, target: &Path) -> Result<usize, ClipRateError> {
    let files = list_json_files(source).map_err(ClipRateError::Infrastructure)?;
    if files.is_empty() {
        return Ok(0);
    }

    fs::create_dir_all(target).map_err(InfrastructureError::Io)?;
    for file in &files {
        if let Some(name) = file.file_name() {
            fs::copy(file, target.join(name)).map_err(InfrastructureError::Io)?;
        }
    }
    Ok(files.len())
}

/// Scales whose values aggregate numerically: sliders, and discrete scales
/// whose option list is all numbers.
fn numeric_scales(set: &ScaleSet) -> impl Iterator<Item = &crate::domain::scale::RatingScale> {
    set.scales.iter().filter(|s| match s.kind {
        ScaleKind::Slider => true,
        ScaleKind::Discrete => !s.values.is_empty() && s.values.iter().all(|v| v.is_number()),
        ScaleKind::Text => false,
    })
}

fn view_columns(conn: &Connection, view: &str) -> Result<Vec<String>, ClipRateError> {
    let sql = format!("DESCRIBE {}", quote_ident(view));
    let mut stmt = conn.prepare(&sql).map_err(InfrastructureError::from)?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>("column_name"))
        .map_err(InfrastructureError::from)?
        .collect::<Result<_, _>>()
        .map_err(InfrastructureError::from)?;
    Ok(columns)
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn quote_str(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;
    use serde_json::json;
    use tempfile::tempdir;

    use crate::domain::scale::{InitialState, RatingScale};

    fn discrete(title: &str) -> RatingScale {
        RatingScale {
            title: title.to_string(),
            kind: ScaleKind::Discrete,
            values: vec![json!(1), json!(2), json!(3), json!(4), json!(5)],
            slider_min: 0.0,
            slider_max: 100.0,
            label_low: String::new(),
            label_high: String::new(),
            required_to_proceed: true,
            group: None,
            initial_state: InitialState::Low,
            active: true,
        }
    }

    fn write_rating(root: &Path, user: &str, action: &str, creativity: i64) -> Result<()> {
        let dir = root.join("user_ratings");
        fs::create_dir_all(&dir)?;
        let record = json!({"user_id": user, "id": action, "creativity": creativity});
        fs::write(
            dir.join(format!("{}_{}.json", user, action)),
            serde_json::to_string_pretty(&record)?,
        )?;
        Ok(())
    }

    fn write_user(root: &Path, user: &str) -> Result<()> {
        let dir = root.join("user_data");
        fs::create_dir_all(&dir)?;
        fs::write(
            dir.join(format!("{}.json", user)),
            serde_json::to_string(&json!({"user_id": user, "age": 30}))?,
        )?;
        Ok(())
    }

    #[test]
    fn test_full_export() -> Result<()> {
        let dir = tempdir()?;
        write_user(dir.path(), "AAAA11")?;
        write_user(dir.path(), "BBBB22")?;
        write_rating(dir.path(), "AAAA11", "event_004", 2)?;
        write_rating(dir.path(), "BBBB22", "event_004", 4)?;
        write_rating(dir.path(), "BBBB22", "event_009", 5)?;

        let config = AppConfig::default();
        let scales = ScaleSet::new(vec![discrete("Creativity")], vec![]);
        let summary = export_all(dir.path(), &config, &scales)?;

        assert_eq!(summary.ratings_rows, 3);
        assert_eq!(summary.users_rows, 2);
        assert_eq!(summary.aggregated_videos, 2);
        assert_eq!(summary.backed_up_files, 5);

        let ratings_csv = fs::read_to_string(dir.path().join("output/ratings.csv"))?;
        assert!(ratings_csv.contains("creativity"));
        assert!(ratings_csv.contains("event_009"));

        // 2 and 4 average to 3.0 for event_004.
        let means = fs::read_to_string(dir.path().join("output/mean_ratings.csv"))?;
        assert!(means.contains("mean_creativity"));
        assert!(means.lines().any(|l| l.starts_with("event_004,2,3.0")));

        let log = fs::read_to_string(dir.path().join("output/rating_log.txt"))?;
        assert!(log.contains("Total ratings: 3"));
        assert!(log.contains("Raters: 2"));
        assert!(log.contains("2 rating(s): 1 video(s)"));
        Ok(())
    }

    #[test]
    fn test_empty_store_exports_nothing() -> Result<()> {
        let dir = tempdir()?;
        let summary = export_all(dir.path(), &AppConfig::default(), &ScaleSet::default())?;

        assert_eq!(summary.ratings_rows, 0);
        assert_eq!(summary.backed_up_files, 0);
        assert!(!dir.path().join("output/ratings.csv").exists());
        Ok(())
    }

    #[test]
    fn test_escaping_output_path_is_rejected() {
        let dir = tempdir().unwrap();
        let mut config = AppConfig::default();
        config.paths.output_path = "../outside".to_string();

        let err = export_all(dir.path(), &config, &ScaleSet::default()).unwrap_err();
        assert!(matches!(err, ClipRateError::UnsafePath(_)));
    }

    #[test]
    fn test_missing_scale_column_is_skipped() -> Result<()> {
        let dir = tempdir()?;
        write_rating(dir.path(), "AAAA11", "event_004", 3)?;

        // One configured scale was never answered in the data.
        let scales = ScaleSet::new(vec![discrete("Creativity"), discrete("Ghost Scale")], vec![]);
        export_all(dir.path(), &AppConfig::default(), &scales)?;

        let means = fs::read_to_string(dir.path().join("output/mean_ratings.csv"))?;
        assert!(means.contains("mean_creativity"));
        assert!(!means.contains("ghost_scale"));
        Ok(())
    }
}
