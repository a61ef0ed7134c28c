// cliprate-core/src/application/gateway.rs
//
// Fans one logical save out to the enabled backends. Persistence is
// best-effort per backend: a save succeeds when at least one backend took the
// row, and a failing backend is logged, never surfaced to the participant.
// Reads merge both backends so a row saved on only one side still counts.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::error::ClipRateError;
use crate::infrastructure::adapters::{LocalJsonStore, WorksheetStore};
use crate::infrastructure::config::AppConfig;
use crate::ports::store::{Record, RecordStore};

pub struct PersistenceGateway {
    local: Option<Arc<dyn RecordStore>>,
    online: Option<Arc<dyn RecordStore>>,
    users_worksheet: String,
    ratings_worksheet: String,
}

impl PersistenceGateway {
    /// Wire up the backends selected by `settings.storage_mode`.
    ///
    /// When both backends are requested and the worksheet database cannot be
    /// opened, the gateway degrades to local-only with a warning. When the
    /// worksheet is the ONLY backend, that failure is fatal.
    pub fn from_config(project_dir: &Path, config: &AppConfig) -> Result<Self, ClipRateError> {
        let mode = config.settings.storage_mode;

        let local: Option<Arc<dyn RecordStore>> = if mode.local_enabled() {
            Some(Arc::new(LocalJsonStore::new(
                project_dir.join(&config.paths.user_data_path),
                project_dir.join(&config.paths.ratings_path),
                &config.settings.users_worksheet,
                &config.settings.ratings_worksheet,
            )))
        } else {
            None
        };

        let online: Option<Arc<dyn RecordStore>> = if mode.online_enabled() {
            let sheet_path = if config.paths.sheet_path == ":memory:" {
                config.paths.sheet_path.clone()
            } else {
                project_dir.join(&config.paths.sheet_path).to_string_lossy().into_owned()
            };
            match WorksheetStore::new(
                &sheet_path,
                &config.settings.users_worksheet,
                &config.settings.ratings_worksheet,
            ) {
                Ok(store) => Some(Arc::new(store)),
                Err(e) if local.is_some() => {
                    warn!(error = %e, "Worksheet backend unavailable, continuing local-only");
                    None
                }
                Err(e) => return Err(ClipRateError::Infrastructure(e)),
            }
        } else {
            None
        };

        info!(
            local = local.is_some(),
            online = online.is_some(),
            "Persistence gateway ready"
        );

        Ok(Self {
            local,
            online,
            users_worksheet: config.settings.users_worksheet.clone(),
            ratings_worksheet: config.settings.ratings_worksheet.clone(),
        })
    }

    #[cfg(test)]
    fn from_stores(
        local: Option<Arc<dyn RecordStore>>,
        online: Option<Arc<dyn RecordStore>>,
    ) -> Self {
        Self {
            local,
            online,
            users_worksheet: "users".to_string(),
            ratings_worksheet: "ratings".to_string(),
        }
    }

    fn backends(&self) -> impl Iterator<Item = &Arc<dyn RecordStore>> {
        self.online.iter().chain(self.local.iter())
    }

    /// True when at least one backend persisted the record.
    /// A total miss is logged at error level; the caller decides whether to
    /// block the participant.
    async fn save(&self, worksheet: &str, record: &Record) -> bool {
        let mut saved = false;
        for store in self.backends() {
            match store.append(worksheet, record).await {
                Ok(()) => saved = true,
                Err(e) => {
                    error!(
                        backend = store.backend_name(),
                        worksheet,
                        error = %e,
                        "Backend failed to persist record"
                    );
                }
            }
        }
        if !saved {
            error!(worksheet, "CRITICAL: no backend persisted the record, data lost");
        }
        saved
    }

    pub async fn save_user(&self, record: &Record) -> bool {
        self.save(&self.users_worksheet, record).await
    }

    pub async fn save_rating(&self, record: &Record) -> bool {
        self.save(&self.ratings_worksheet, record).await
    }

    /// A participant exists when ANY backend knows the id.
    /// A failing backend counts as "not found there", not as an error.
    pub async fn user_exists(&self, user_id: &str) -> bool {
        for store in self.backends() {
            match store.user_exists(user_id).await {
                Ok(true) => return true,
                Ok(false) => {}
                Err(e) => {
                    warn!(backend = store.backend_name(), error = %e, "User lookup failed");
                }
            }
        }
        false
    }

    /// Union of the already-rated action ids across backends.
    pub async fn rated_action_ids(&self, user_id: &str) -> Vec<String> {
        let mut ids = HashSet::new();
        for store in self.backends() {
            match store.rated_action_ids(user_id).await {
                Ok(found) => ids.extend(found),
                Err(e) => {
                    warn!(backend = store.backend_name(), error = %e, "Rated-ids lookup failed");
                }
            }
        }
        let mut ids: Vec<String> = ids.into_iter().collect();
        ids.sort();
        ids
    }

    /// Union of all known participant ids, for collision-free generation.
    pub async fn all_user_ids(&self) -> HashSet<String> {
        let mut ids = HashSet::new();
        for store in self.backends() {
            match store.all_user_ids().await {
                Ok(found) => ids.extend(found),
                Err(e) => {
                    warn!(backend = store.backend_name(), error = %e, "User-ids listing failed");
                }
            }
        }
        ids
    }

    /// Ratings per action id. The worksheet is authoritative when reachable
    /// (it sees every device), the local files are the fallback.
    pub async fn rating_counts(&self) -> HashMap<String, usize> {
        for store in self.backends() {
            match store.rating_counts().await {
                Ok(counts) => return counts,
                Err(e) => {
                    warn!(backend = store.backend_name(), error = %e, "Rating counts unavailable");
                }
            }
        }
        HashMap::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    /// A backend that is down: every call errors.
    struct BrokenStore;

    #[async_trait]
    impl RecordStore for BrokenStore {
        async fn append(&self, _: &str, _: &Record) -> Result<(), ClipRateError> {
            Err(ClipRateError::InternalError("backend down".into()))
        }
        async fn user_exists(&self, _: &str) -> Result<bool, ClipRateError> {
            Err(ClipRateError::InternalError("backend down".into()))
        }
        async fn rated_action_ids(&self, _: &str) -> Result<Vec<String>, ClipRateError> {
            Err(ClipRateError::InternalError("backend down".into()))
        }
        async fn all_user_ids(&self) -> Result<Vec<String>, ClipRateError> {
            Err(ClipRateError::InternalError("backend down".into()))
        }
        async fn rating_counts(&self) -> Result<HashMap<String, usize>, ClipRateError> {
            Err(ClipRateError::InternalError("backend down".into()))
        }
        fn backend_name(&self) -> &str {
            "broken"
        }
    }

    fn local_store(root: &Path) -> Arc<dyn RecordStore> {
        Arc::new(LocalJsonStore::new(
            root.join("user_data"),
            root.join("user_ratings"),
            "users",
            "ratings",
        ))
    }

    fn memory_worksheet() -> Arc<dyn RecordStore> {
        Arc::new(WorksheetStore::new(":memory:", "users", "ratings").unwrap())
    }

    fn user_record(user_id: &str) -> Record {
        BTreeMap::from([("user_id".to_string(), json!(user_id))])
    }

    #[tokio::test]
    async fn test_save_lands_on_both_backends() -> Result<()> {
        let dir = tempdir()?;
        let gateway =
            PersistenceGateway::from_stores(Some(local_store(dir.path())), Some(memory_worksheet()));

        assert!(gateway.save_user(&user_record("ABCD12")).await);

        // Visible to the gateway and present on disk.
        assert!(gateway.user_exists("ABCD12").await);
        assert!(dir.path().join("user_data/ABCD12.json").exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_one_broken_backend_does_not_block_the_save() -> Result<()> {
        let dir = tempdir()?;
        let gateway =
            PersistenceGateway::from_stores(Some(local_store(dir.path())), Some(Arc::new(BrokenStore)));

        assert!(gateway.save_user(&user_record("ABCD12")).await);
        assert!(dir.path().join("user_data/ABCD12.json").exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_all_backends_broken_reports_failure() {
        let gateway =
            PersistenceGateway::from_stores(Some(Arc::new(BrokenStore)), Some(Arc::new(BrokenStore)));
        assert!(!gateway.save_user(&user_record("ABCD12")).await);
        assert!(!gateway.user_exists("ABCD12").await);
        assert!(gateway.all_user_ids().await.is_empty());
    }

    #[tokio::test]
    async fn test_reads_union_both_backends() -> Result<()> {
        let dir = tempdir()?;
        let local = local_store(dir.path());
        let online = memory_worksheet();

        // One rating on each side only.
        let mut rating = user_record("ABCD12");
        rating.insert("id".to_string(), json!("event_004"));
        local.append("ratings", &rating).await?;

        let mut rating = user_record("ABCD12");
        rating.insert("id".to_string(), json!("event_009"));
        online.append("ratings", &rating).await?;

        let gateway = PersistenceGateway::from_stores(Some(local), Some(online));
        assert_eq!(
            gateway.rated_action_ids("ABCD12").await,
            vec!["event_004", "event_009"]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_from_config_degrades_both_to_local_on_bad_sheet() -> Result<()> {
        let dir = tempdir()?;
        let mut config = AppConfig::default();
        // A directory is not a valid worksheet database.
        config.paths.sheet_path = ".".to_string();

        let gateway = PersistenceGateway::from_config(dir.path(), &config)?;
        assert!(gateway.online.is_none());
        assert!(gateway.local.is_some());
        Ok(())
    }
}
