// cliprate-core/src/infrastructure/adapters/local_json.rs
//
// Local backend: one JSON file per record. Filenames ARE the index:
//   users    -> {user_id}.json
//   ratings  -> {user_id}_{action_id}.json
// A crash leaves individually-valid files, never a corrupted single store.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::domain::rating::rating_file_stem;
use crate::error::ClipRateError;
use crate::infrastructure::error::InfrastructureError;
use crate::infrastructure::fs::{atomic_write, list_json_files};
use crate::ports::store::{Record, RecordStore};

pub struct LocalJsonStore {
    user_dir: PathBuf,
    ratings_dir: PathBuf,
    users_worksheet: String,
    ratings_worksheet: String,
}

impl LocalJsonStore {
    pub fn new(
        user_dir: impl Into<PathBuf>,
        ratings_dir: impl Into<PathBuf>,
        users_worksheet: &str,
        ratings_worksheet: &str,
    ) -> Self {
        Self {
            user_dir: user_dir.into(),
            ratings_dir: ratings_dir.into(),
            users_worksheet: users_worksheet.to_string(),
            ratings_worksheet: ratings_worksheet.to_string(),
        }
    }

    fn record_str(record: &Record, key: &str) -> Result<String, ClipRateError> {
        match record.get(key) {
            Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
            _ => Err(ClipRateError::Infrastructure(
                InfrastructureError::ConfigError(format!(
                    "Record is missing the '{}' key required for its filename",
                    key
                )),
            )),
        }
    }

    fn stems(dir: &Path) -> Result<Vec<String>, ClipRateError> {
        Ok(list_json_files(dir)
            .map_err(ClipRateError::Infrastructure)?
            .iter()
            .filter_map(|p| p.file_stem().and_then(|s| s.to_str()).map(String::from))
            .collect())
    }
}

#[async_trait]
impl RecordStore for LocalJsonStore {
    async fn append(&self, worksheet: &str, record: &Record) -> Result<(), ClipRateError> {
        let user_id = Self::record_str(record, "user_id")?;

        let (dir, stem) = if worksheet == self.users_worksheet {
            (&self.user_dir, user_id)
        } else if worksheet == self.ratings_worksheet {
            let action_id = Self::record_str(record, "id")?;
            (&self.ratings_dir, rating_file_stem(&user_id, &action_id))
        } else {
            return Err(ClipRateError::Infrastructure(
                InfrastructureError::ConfigError(format!(
                    "Local backend knows no worksheet named '{}'",
                    worksheet
                )),
            ));
        };

        fs::create_dir_all(dir).map_err(InfrastructureError::Io)?;
        let json = serde_json::to_string_pretty(record).map_err(InfrastructureError::JsonError)?;
        let path = dir.join(format!("{}.json", stem));
        atomic_write(&path, json).map_err(ClipRateError::Infrastructure)?;

        info!(file = %path.display(), "Record saved to local JSON");
        Ok(())
    }

    async fn user_exists(&self, user_id: &str) -> Result<bool, ClipRateError> {
        let needle = user_id.to_lowercase();

        // Primary: the user-data folder.
        if Self::stems(&self.user_dir)?
            .iter()
            .any(|stem| stem.to_lowercase() == needle)
        {
            return Ok(true);
        }

        // Fallback: any rating file carrying this user prefix.
        Ok(Self::stems(&self.ratings_dir)?
            .iter()
            .filter_map(|stem| stem.split('_').next().map(str::to_lowercase))
            .any(|prefix| prefix == needle))
    }

    async fn rated_action_ids(&self, user_id: &str) -> Result<Vec<String>, ClipRateError> {
        let needle = user_id.to_lowercase();
        let mut ids = Vec::new();

        for stem in Self::stems(&self.ratings_dir)? {
            // {user_id}_{action_id}; action ids may themselves contain '_'.
            if let Some((file_user, action_id)) = stem.split_once('_') {
                if file_user.to_lowercase() == needle {
                    ids.push(action_id.to_string());
                }
            }
        }
        Ok(ids)
    }

    async fn all_user_ids(&self) -> Result<Vec<String>, ClipRateError> {
        Self::stems(&self.user_dir)
    }

    async fn rating_counts(&self) -> Result<HashMap<String, usize>, ClipRateError> {
        let mut counts = HashMap::new();
        for stem in Self::stems(&self.ratings_dir)? {
            if let Some((_, action_id)) = stem.split_once('_') {
                *counts.entry(action_id.to_string()).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    fn backend_name(&self) -> &str {
        "local_json"
    }
}
