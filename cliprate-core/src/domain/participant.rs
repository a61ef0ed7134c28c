// cliprate-core/src/domain/participant.rs

use chrono::{Local, SecondsFormat};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

use crate::domain::error::DomainError;
use crate::domain::scale::is_empty_value;

const ID_MAX_ATTEMPTS: usize = 1000;

/// One intake question from the questionnaire config.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct QuestionnaireField {
    pub field_name: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type", default)]
    pub kind: FieldKind,
    #[serde(default)]
    pub hint_text: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub required_to_proceed: bool,
    /// Rendering group (e.g. the three birthday boxes). Not a quorum group.
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub max_length: Option<usize>,
    #[serde(default)]
    pub active: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    #[default]
    Text,
    Numeric,
    MultipleChoice,
}

/// One survey participant. Created at questionnaire completion, immutable
/// once persisted except for the consent metadata appended to the record.
#[derive(Debug, Clone, Default)]
pub struct Participant {
    pub user_id: String,
    pub fields: BTreeMap<String, Value>,
    pub consent_given: bool,
    pub consent_timestamp: Option<String>,
}

impl Participant {
    pub fn set_field(&mut self, name: &str, value: Value) {
        self.fields.insert(name.to_string(), value);
    }

    pub fn give_consent(&mut self) {
        self.consent_given = true;
        self.consent_timestamp =
            Some(Local::now().to_rfc3339_opts(SecondsFormat::Secs, false));
    }

    /// Generate and assign a fresh id: 4 uppercase letters + 2 digits
    /// (e.g. ABCD12). Retries until it misses `existing_ids`, capped so a
    /// saturated id space fails loudly instead of spinning forever.
    pub fn generate_user_id<R: Rng>(
        &mut self,
        existing_ids: &HashSet<String>,
        rng: &mut R,
    ) -> Result<String, DomainError> {
        for _ in 0..ID_MAX_ATTEMPTS {
            let mut id = String::with_capacity(6);
            for _ in 0..4 {
                id.push(rng.gen_range(b'A'..=b'Z') as char);
            }
            for _ in 0..2 {
                id.push(rng.gen_range(b'0'..=b'9') as char);
            }

            if !existing_ids.contains(&id) {
                self.user_id = id.clone();
                return Ok(id);
            }
        }
        Err(DomainError::UserIdExhausted(ID_MAX_ATTEMPTS))
    }

    /// Flatten to a persistence record: id, every field value, a `saved_at`
    /// timestamp, and the consent metadata when given.
    pub fn to_record(&self) -> BTreeMap<String, Value> {
        let mut record = BTreeMap::new();
        record.insert("user_id".to_string(), Value::String(self.user_id.clone()));
        for (name, value) in &self.fields {
            record.insert(name.clone(), value.clone());
        }
        record.insert(
            "saved_at".to_string(),
            Value::String(Local::now().to_rfc3339_opts(SecondsFormat::Secs, false)),
        );
        if self.consent_given {
            record.insert("consent_given".to_string(), Value::Bool(true));
            if let Some(ts) = &self.consent_timestamp {
                record.insert("consent_timestamp".to_string(), Value::String(ts.clone()));
            }
        }
        record
    }
}

/// Titles of required questionnaire fields the participant left empty.
/// For numeric fields 0 is a valid answer; only None/blank count as missing.
pub fn missing_required_fields<'a>(
    fields: &'a [QuestionnaireField],
    participant: &Participant,
) -> Vec<&'a str> {
    fields
        .iter()
        .filter(|f| f.required_to_proceed)
        .filter(|f| is_empty_value(participant.fields.get(&f.field_name)))
        .map(|f| {
            if !f.title.is_empty() {
                f.title.as_str()
            } else if !f.hint_text.is_empty() {
                f.hint_text.as_str()
            } else {
                f.field_name.as_str()
            }
        })
        .collect()
}
