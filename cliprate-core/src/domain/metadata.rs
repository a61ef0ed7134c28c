// cliprate-core/src/domain/metadata.rs
//
// In-memory view of the external metadata table: one row per video id,
// string-typed columns. Read-only: id lookup and by-column filtering.

use std::collections::BTreeMap;

pub type MetaRow = BTreeMap<String, String>;

#[derive(Debug, Clone, Default)]
pub struct MetadataTable {
    rows: Vec<MetaRow>,
}

impl MetadataTable {
    pub fn new(rows: Vec<MetaRow>) -> Self {
        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[MetaRow] {
        &self.rows
    }

    pub fn get(&self, id: &str) -> Option<&MetaRow> {
        self.rows.iter().find(|r| r.get("id").map(String::as_str) == Some(id))
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.rows.iter().any(|r| r.contains_key(column))
    }

    /// Rows whose `column` value equals `level` (exact string match).
    pub fn filter_eq(&self, column: &str, level: &str) -> MetadataTable {
        MetadataTable {
            rows: self
                .rows
                .iter()
                .filter(|r| r.get(column).map(String::as_str) == Some(level))
                .cloned()
                .collect(),
        }
    }

    /// Keep only rows whose id is in `ids`.
    pub fn restrict_to(&self, ids: &[String]) -> MetadataTable {
        MetadataTable {
            rows: self
                .rows
                .iter()
                .filter(|r| r.get("id").is_some_and(|id| ids.contains(id)))
                .cloned()
                .collect(),
        }
    }

    pub fn ids(&self) -> Vec<String> {
        self.rows.iter().filter_map(|r| r.get("id").cloned()).collect()
    }
}

/// Confusion matrix for the completion-screen outcome predictions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutcomeReport {
    pub true_win: usize,
    pub false_win: usize,
    pub true_loss: usize,
    pub false_loss: usize,
    pub total_predictions: usize,
    pub skipped_no_prediction: usize,
    pub skipped_no_metadata: usize,
}

impl OutcomeReport {
    pub fn correct(&self) -> usize {
        self.true_win + self.true_loss
    }

    pub fn accuracy_pct(&self) -> Option<f64> {
        if self.total_predictions == 0 {
            return None;
        }
        Some(self.correct() as f64 / self.total_predictions as f64 * 100.0)
    }
}

/// Score a session's win/loss predictions against the `outcome_column`
/// ground truth. Case-insensitive on both sides; predictions without a
/// metadata row (or left blank) are skipped, not errors.
pub fn score_outcomes(
    predictions: &BTreeMap<String, String>,
    metadata: &MetadataTable,
    outcome_column: &str,
) -> OutcomeReport {
    let mut report = OutcomeReport::default();

    for (video_id, prediction) in predictions {
        if prediction.is_empty() {
            report.skipped_no_prediction += 1;
            continue;
        }
        let Some(row) = metadata.get(video_id) else {
            report.skipped_no_metadata += 1;
            continue;
        };
        let Some(truth) = row.get(outcome_column) else {
            report.skipped_no_metadata += 1;
            continue;
        };

        let predicted = prediction.to_lowercase();
        let actual = truth.to_lowercase();
        report.total_predictions += 1;

        match (predicted.as_str(), actual.as_str()) {
            ("win", "win") => report.true_win += 1,
            ("win", "loss") => report.false_win += 1,
            ("loss", "loss") => report.true_loss += 1,
            ("loss", "win") => report.false_loss += 1,
            _ => {}
        }
    }

    report
}
