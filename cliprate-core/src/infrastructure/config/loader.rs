// cliprate-core/src/infrastructure/config/loader.rs

use serde_yaml::Value as YamlValue;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

use crate::domain::participant::QuestionnaireField;
use crate::domain::scale::{RatingGroup, RatingScale, ScaleSet};
use crate::infrastructure::config::settings::{AppConfig, StorageMode};
use crate::infrastructure::error::InfrastructureError;

// --- MAIN CONFIG ---

#[instrument(skip(project_dir))]
pub fn load_config(project_dir: &Path) -> Result<AppConfig, InfrastructureError> {
    // 1. Découverte du fichier principal
    let config_path = find_main_config(project_dir)?;
    info!(path = ?config_path, "Loading survey configuration");

    // 2. Chargement YAML
    let content = fs::read_to_string(&config_path)?;
    let mut config: AppConfig = serde_yaml::from_str(&content)?;

    // 3. Override via Variables d'Environnement (Pattern 'Layering')
    // Permet de faire: CLIPRATE_STORAGE_MODE=local cliprate check
    apply_env_overrides(&mut config);

    Ok(config)
}

fn find_main_config(root: &Path) -> Result<PathBuf, InfrastructureError> {
    let candidates = ["config/config.yaml", "config.yaml"];
    for filename in candidates {
        let p = root.join(filename);
        if p.exists() {
            return Ok(p);
        }
    }
    Err(InfrastructureError::ConfigNotFound(format!(
        "No configuration file found in {:?}. Checked: {:?}",
        root, candidates
    )))
}

fn apply_env_overrides(config: &mut AppConfig) {
    if let Ok(val) = std::env::var("CLIPRATE_STORAGE_MODE") {
        let parsed = match val.to_lowercase().as_str() {
            "local" => Some(StorageMode::Local),
            "online" => Some(StorageMode::Online),
            "both" => Some(StorageMode::Both),
            other => {
                warn!(value = other, "Ignoring invalid CLIPRATE_STORAGE_MODE");
                None
            }
        };
        if let Some(mode) = parsed {
            info!(old = ?config.settings.storage_mode, new = ?mode, "Overriding storage mode via ENV");
            config.settings.storage_mode = mode;
        }
    }
    if let Ok(val) = std::env::var("CLIPRATE_SHEET_PATH") {
        info!(old = ?config.paths.sheet_path, new = ?val, "Overriding worksheet path via ENV");
        config.paths.sheet_path = val;
    }
}

// --- SATELLITES (Questionnaire + Scales) ---
// Both degrade to empty when their file is missing: the feature relying on
// them reports inline, the session itself keeps running.

#[instrument(skip(project_dir, config))]
pub fn load_questionnaire_fields(
    project_dir: &Path,
    config: &AppConfig,
) -> Result<Vec<QuestionnaireField>, InfrastructureError> {
    let path = project_dir.join(&config.settings.questionnaire_fields_file);
    if !path.exists() {
        warn!(path = ?path, "Questionnaire fields file not found, using empty questionnaire");
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(&path)?;
    let all_fields: Option<Vec<QuestionnaireField>> = serde_yaml::from_str(&content)?;
    let all_fields = all_fields.unwrap_or_default();

    Ok(all_fields.into_iter().filter(|f| f.active).collect())
}

/// Load rating scales and groups from the configured file.
///
/// Two accepted formats: the legacy bare list of scales, and the grouped
/// `{groups: [...], scales: [...]}` mapping. Only `active` scales survive;
/// group quorums are clamped inside `ScaleSet::new`.
#[instrument(skip(project_dir, config))]
pub fn load_rating_scales(
    project_dir: &Path,
    config: &AppConfig,
) -> Result<ScaleSet, InfrastructureError> {
    let path = project_dir.join(&config.settings.rating_scales_file);
    if !path.exists() {
        warn!(path = ?path, "Rating scales file not found, using empty rating scales");
        return Ok(ScaleSet::default());
    }

    let content = fs::read_to_string(&path)?;
    let raw: YamlValue = serde_yaml::from_str(&content)?;

    let (all_scales, groups): (Vec<RatingScale>, Vec<RatingGroup>) = match raw {
        YamlValue::Null => (Vec::new(), Vec::new()),
        YamlValue::Sequence(_) => {
            info!("Using legacy rating scales format (list of scales)");
            (serde_yaml::from_value(raw)?, Vec::new())
        }
        YamlValue::Mapping(ref map) => {
            let groups = match map.get("groups") {
                Some(v) if !v.is_null() => serde_yaml::from_value(v.clone())?,
                _ => Vec::new(),
            };
            let scales = match map.get("scales") {
                Some(v) if !v.is_null() => serde_yaml::from_value(v.clone())?,
                _ => Vec::new(),
            };
            (scales, groups)
        }
        other => {
            return Err(InfrastructureError::ConfigError(format!(
                "Unexpected rating scales format: {:?}",
                other
            )))
        }
    };

    let active_scales: Vec<RatingScale> = all_scales.into_iter().filter(|s| s.active).collect();
    Ok(ScaleSet::new(active_scales, groups))
}
