// cliprate-core/src/infrastructure/config/settings.rs
//
// Typed view of config/config.yaml. The core only reads the keys it needs;
// unknown keys are ignored, never validated away.

use serde::{Deserialize, Serialize};

use crate::domain::sampler::StratumSpec;

/// Which backends a save targets.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    Local,
    Online,
    #[default]
    Both,
}

impl StorageMode {
    pub fn local_enabled(self) -> bool {
        matches!(self, StorageMode::Local | StorageMode::Both)
    }

    pub fn online_enabled(self) -> bool {
        matches!(self, StorageMode::Online | StorageMode::Both)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub settings: SettingsConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PathsConfig {
    #[serde(default = "default_video_path")]
    pub video_path: String,

    #[serde(default = "default_familiarization_path")]
    pub familiarization_video_path: String,

    /// Tabular metadata keyed by video id (.csv or .duckdb).
    #[serde(default)]
    pub metadata_path: Option<String>,

    #[serde(default = "default_user_data_path")]
    pub user_data_path: String,

    #[serde(default = "default_ratings_path")]
    pub ratings_path: String,

    /// Worksheet database standing in for the remote spreadsheet.
    #[serde(default = "default_sheet_path")]
    pub sheet_path: String,

    #[serde(default = "default_output_path")]
    pub output_path: String,

    #[serde(default = "default_backup_path")]
    pub backup_path: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SettingsConfig {
    #[serde(default)]
    pub storage_mode: StorageMode,

    /// Target sample size; absent means "the whole pool".
    #[serde(default)]
    pub number_of_videos: Option<usize>,

    /// A video leaves the pool once it has this many ratings overall.
    #[serde(default = "default_min_ratings")]
    pub min_ratings_per_video: usize,

    #[serde(default = "default_true")]
    pub enable_familiarization: bool,

    #[serde(default = "default_true")]
    pub display_metadata: bool,

    #[serde(default = "default_true")]
    pub display_pitch: bool,

    #[serde(default = "default_playback_mode")]
    pub video_playback_mode: String,

    #[serde(default)]
    pub variables_for_stratification: Vec<StratumSpec>,

    #[serde(default = "default_questionnaire_file")]
    pub questionnaire_fields_file: String,

    #[serde(default = "default_scales_file")]
    pub rating_scales_file: String,

    #[serde(default = "default_users_worksheet")]
    pub users_worksheet: String,

    #[serde(default = "default_ratings_worksheet")]
    pub ratings_worksheet: String,

    /// Metadata columns surfaced to the participant, in display order.
    #[serde(default)]
    pub metadata_to_show: Vec<MetadataDisplayField>,

    /// Categorical outcome column used for completion-screen accuracy.
    #[serde(default = "default_outcome_column")]
    pub outcome_column: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MetadataDisplayField {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub column: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            video_path: default_video_path(),
            familiarization_video_path: default_familiarization_path(),
            metadata_path: None,
            user_data_path: default_user_data_path(),
            ratings_path: default_ratings_path(),
            sheet_path: default_sheet_path(),
            output_path: default_output_path(),
            backup_path: default_backup_path(),
        }
    }
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            storage_mode: StorageMode::default(),
            number_of_videos: None,
            min_ratings_per_video: default_min_ratings(),
            enable_familiarization: true,
            display_metadata: true,
            display_pitch: true,
            video_playback_mode: default_playback_mode(),
            variables_for_stratification: Vec::new(),
            questionnaire_fields_file: default_questionnaire_file(),
            rating_scales_file: default_scales_file(),
            users_worksheet: default_users_worksheet(),
            ratings_worksheet: default_ratings_worksheet(),
            metadata_to_show: Vec::new(),
            outcome_column: default_outcome_column(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_video_path() -> String {
    "videos".to_string()
}
fn default_familiarization_path() -> String {
    "videos_familiarization".to_string()
}
fn default_user_data_path() -> String {
    "user_data".to_string()
}
fn default_ratings_path() -> String {
    "user_ratings".to_string()
}
fn default_sheet_path() -> String {
    "worksheets.duckdb".to_string()
}
fn default_output_path() -> String {
    "output".to_string()
}
fn default_backup_path() -> String {
    "backup".to_string()
}
fn default_min_ratings() -> usize {
    3
}
fn default_playback_mode() -> String {
    "loop".to_string()
}
fn default_questionnaire_file() -> String {
    "config/questionnaire_fields.yaml".to_string()
}
fn default_scales_file() -> String {
    "config/rating_scales.yaml".to_string()
}
fn default_users_worksheet() -> String {
    "users".to_string()
}
fn default_ratings_worksheet() -> String {
    "ratings".to_string()
}
fn default_outcome_column() -> String {
    "WinLoss".to_string()
}
