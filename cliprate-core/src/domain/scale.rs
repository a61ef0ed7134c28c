// cliprate-core/src/domain/scale.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

/// Widget family of a rating scale.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScaleKind {
    #[default]
    Discrete,
    Slider,
    Text,
}

/// Where a slider starts before the participant touches it.
/// A slider only counts as "changed" once it leaves this position.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InitialState {
    #[default]
    Low,
    High,
    Center,
}

/// One rated dimension. Identity is `title` (also the persistence key).
/// Loaded once per session from YAML, never mutated afterwards.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RatingScale {
    pub title: String,

    #[serde(rename = "type", default)]
    pub kind: ScaleKind,

    /// Pill options for discrete scales.
    #[serde(default)]
    pub values: Vec<Value>,

    #[serde(default = "default_slider_min")]
    pub slider_min: f64,
    #[serde(default = "default_slider_max")]
    pub slider_max: f64,

    #[serde(default)]
    pub label_low: String,
    #[serde(default)]
    pub label_high: String,

    #[serde(default = "default_true")]
    pub required_to_proceed: bool,

    /// Quorum group this scale belongs to, if any.
    #[serde(default)]
    pub group: Option<String>,

    #[serde(default)]
    pub initial_state: InitialState,

    #[serde(default)]
    pub active: bool,
}

impl RatingScale {
    /// Starting value of a slider, derived from `initial_state` and the bounds.
    pub fn initial_value(&self) -> f64 {
        match self.initial_state {
            InitialState::Low => self.slider_min,
            InitialState::High => self.slider_max,
            InitialState::Center => (self.slider_min + self.slider_max) / 2.0,
        }
    }
}

/// A quorum constraint over the scales sharing a `group` id.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RatingGroup {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub number_of_ratings: usize,
    #[serde(default)]
    pub error_msg: String,
}

/// Effective quorum of a group after load-time clamping.
#[derive(Debug, Clone)]
pub struct GroupRequirement {
    pub title: String,
    pub required: usize,
    pub error_msg: String,
}

/// Active scales + groups + the effective per-group quorums.
#[derive(Debug, Clone, Default)]
pub struct ScaleSet {
    pub scales: Vec<RatingScale>,
    pub groups: Vec<RatingGroup>,
    pub group_requirements: HashMap<String, GroupRequirement>,
}

impl ScaleSet {
    /// Assemble a set from already-filtered active scales and declared groups.
    ///
    /// Config-time cross-check (NOT a per-submission rule): a quorum larger
    /// than the number of active member scales is clamped down to that count.
    pub fn new(scales: Vec<RatingScale>, groups: Vec<RatingGroup>) -> Self {
        let mut member_counts: HashMap<&str, usize> = HashMap::new();
        for scale in &scales {
            if let Some(gid) = scale.group.as_deref() {
                *member_counts.entry(gid).or_insert(0) += 1;
            }
        }

        let mut group_requirements = HashMap::new();
        for group in &groups {
            let members = member_counts.get(group.id.as_str()).copied().unwrap_or(0);
            let mut required = group.number_of_ratings;

            if members == 0 {
                warn!(group = %group.id, "Rating scale group has no active scales assigned to it");
            } else if required > members {
                warn!(
                    group = %group.title,
                    id = %group.id,
                    required,
                    members,
                    "Group quorum exceeds member count. All scales in this group will be required."
                );
                required = members;
            }

            group_requirements.insert(
                group.id.clone(),
                GroupRequirement {
                    title: if group.title.is_empty() {
                        group.id.clone()
                    } else {
                        group.title.clone()
                    },
                    required,
                    error_msg: group.error_msg.clone(),
                },
            );
        }

        Self {
            scales,
            groups,
            group_requirements,
        }
    }

    /// Titles of scales that are individually required (required AND ungrouped).
    /// Grouped scales answer to their quorum instead.
    pub fn required_titles(&self) -> Vec<&str> {
        self.scales
            .iter()
            .filter(|s| s.required_to_proceed && s.group.is_none())
            .map(|s| s.title.as_str())
            .collect()
    }

    /// Member scales of one group, in declaration order.
    pub fn scales_in_group(&self, group_id: &str) -> Vec<&RatingScale> {
        self.scales
            .iter()
            .filter(|s| s.group.as_deref() == Some(group_id))
            .collect()
    }
}

/// Empty means: nothing submitted (None) or a blank string.
/// For numeric types any number counts, including 0.
pub fn is_empty_value(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

fn default_true() -> bool {
    true
}
fn default_slider_min() -> f64 {
    0.0
}
fn default_slider_max() -> f64 {
    100.0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn slider(title: &str, group: Option<&str>, initial: InitialState) -> RatingScale {
        RatingScale {
            title: title.to_string(),
            kind: ScaleKind::Slider,
            values: vec![],
            slider_min: 0.0,
            slider_max: 100.0,
            label_low: String::new(),
            label_high: String::new(),
            required_to_proceed: true,
            group: group.map(String::from),
            initial_state: initial,
            active: true,
        }
    }

    #[test]
    fn test_slider_initial_positions() {
        assert_eq!(slider("a", None, InitialState::Low).initial_value(), 0.0);
        assert_eq!(slider("a", None, InitialState::High).initial_value(), 100.0);
        assert_eq!(slider("a", None, InitialState::Center).initial_value(), 50.0);
    }

    #[test]
    fn test_quorum_clamped_to_member_count() {
        let scales = vec![
            slider("Joy", Some("emotions"), InitialState::Low),
            slider("Anger", Some("emotions"), InitialState::Low),
        ];
        let groups = vec![RatingGroup {
            id: "emotions".into(),
            title: "Emotions".into(),
            number_of_ratings: 5,
            error_msg: String::new(),
        }];

        let set = ScaleSet::new(scales, groups);
        assert_eq!(set.group_requirements["emotions"].required, 2);
    }

    #[test]
    fn test_required_titles_skip_grouped_scales() {
        let mut free = slider("Overall", None, InitialState::Low);
        free.kind = ScaleKind::Discrete;
        let grouped = slider("Joy", Some("emotions"), InitialState::Low);

        let set = ScaleSet::new(vec![free, grouped], vec![]);
        assert_eq!(set.required_titles(), vec!["Overall"]);
    }

    #[test]
    fn test_empty_value_semantics() {
        assert!(is_empty_value(None));
        assert!(is_empty_value(Some(&Value::Null)));
        assert!(is_empty_value(Some(&json!(""))));
        assert!(!is_empty_value(Some(&json!(0))));
        assert!(!is_empty_value(Some(&json!("win"))));
    }

    #[test]
    fn test_yaml_roundtrip_defaults() {
        let yaml = r#"
title: Creativity
type: discrete
values: [1, 2, 3, 4, 5, 6, 7]
active: true
"#;
        let scale: RatingScale = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(scale.kind, ScaleKind::Discrete);
        assert!(scale.required_to_proceed);
        assert_eq!(scale.initial_state, InitialState::Low);
        assert_eq!(scale.values.len(), 7);
    }
}
