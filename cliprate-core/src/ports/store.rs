// cliprate-core/src/ports/store.rs

// This file defines what the survey needs from a record store, without
// knowing how it's done. The gateway only sees this shape; whether rows land
// in per-record JSON files or in a worksheet database is an adapter concern.

use crate::error::ClipRateError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// A flat record: one row, string keys to JSON values.
/// BTreeMap keeps key order deterministic across backends.
pub type Record = BTreeMap<String, Value>;

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Append one record to the named logical table ("worksheet").
    /// All-or-nothing: a failed append must not leave a partial row.
    async fn append(&self, worksheet: &str, record: &Record) -> Result<(), ClipRateError>;

    /// Case-insensitive existence check against the users worksheet.
    async fn user_exists(&self, user_id: &str) -> Result<bool, ClipRateError>;

    /// Action ids this user already rated (case-insensitive on user id).
    async fn rated_action_ids(&self, user_id: &str) -> Result<Vec<String>, ClipRateError>;

    /// Every known participant id, for collision-free id generation.
    async fn all_user_ids(&self) -> Result<Vec<String>, ClipRateError>;

    /// Total number of ratings per action id, for retiring saturated videos.
    async fn rating_counts(&self) -> Result<HashMap<String, usize>, ClipRateError>;

    fn backend_name(&self) -> &str;
}
