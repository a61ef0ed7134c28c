// cliprate-core/src/domain/validator.rs
//
// Decides whether a submitted rating screen is complete enough to proceed.
// Returns human-readable messages; an empty list is the only green light.

use serde_json::Value;
use std::collections::BTreeMap;

use crate::domain::scale::{is_empty_value, ScaleKind, ScaleSet};

/// Validate one submission against the active scale set.
///
/// Two independent checks:
/// 1. Individually-required scales (required AND ungrouped) must carry a
///    non-empty value. All misses collapse into a single aggregated line.
/// 2. Each group must reach its quorum of "changed" members. Discrete/text
///    members count when non-empty; slider members only count once they left
///    their configured initial position.
pub fn validate(submitted: &BTreeMap<String, Value>, set: &ScaleSet) -> Vec<String> {
    let mut errors = Vec::new();

    let missing: Vec<&str> = set
        .required_titles()
        .into_iter()
        .filter(|title| is_empty_value(submitted.get(*title)))
        .collect();

    if !missing.is_empty() {
        errors.push(format!("Required fields: {}", missing.join(", ")));
    }

    for group in &set.groups {
        let Some(requirement) = set.group_requirements.get(&group.id) else {
            continue;
        };

        let changed = set
            .scales_in_group(&group.id)
            .iter()
            .filter(|scale| {
                let value = submitted.get(&scale.title);
                if is_empty_value(value) {
                    return false;
                }
                match scale.kind {
                    // A slider sitting at its start position is an untouched widget,
                    // not an answer.
                    ScaleKind::Slider => value
                        .and_then(Value::as_f64)
                        .is_some_and(|v| v != scale.initial_value()),
                    ScaleKind::Discrete | ScaleKind::Text => true,
                }
            })
            .count();

        if changed < requirement.required {
            if requirement.error_msg.is_empty() {
                errors.push(format!(
                    "Group '{}': Please rate at least {} scales (currently {}/{})",
                    requirement.title, requirement.required, changed, requirement.required
                ));
            } else {
                errors.push(requirement.error_msg.clone());
            }
        }
    }

    errors
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::scale::{InitialState, RatingGroup, RatingScale};
    use serde_json::json;

    fn scale(title: &str, kind: ScaleKind, group: Option<&str>, required: bool) -> RatingScale {
        RatingScale {
            title: title.to_string(),
            kind,
            values: vec![],
            slider_min: 0.0,
            slider_max: 100.0,
            label_low: String::new(),
            label_high: String::new(),
            required_to_proceed: required,
            group: group.map(String::from),
            initial_state: InitialState::Low,
            active: true,
        }
    }

    fn emotions_group(quorum: usize, error_msg: &str) -> RatingGroup {
        RatingGroup {
            id: "emotions".into(),
            title: "Emotions".into(),
            number_of_ratings: quorum,
            error_msg: error_msg.to_string(),
        }
    }

    #[test]
    fn test_quorum_two_of_three_sliders_one_moved() {
        let set = ScaleSet::new(
            vec![
                scale("Joy", ScaleKind::Slider, Some("emotions"), true),
                scale("Anger", ScaleKind::Slider, Some("emotions"), true),
                scale("Fear", ScaleKind::Slider, Some("emotions"), true),
            ],
            vec![emotions_group(2, "")],
        );

        // Two sliders untouched at their initial 0.0, one moved.
        let submitted = BTreeMap::from([
            ("Joy".to_string(), json!(0.0)),
            ("Anger".to_string(), json!(0.0)),
            ("Fear".to_string(), json!(42.0)),
        ]);

        let errors = validate(&submitted, &set);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Emotions"));
        assert!(errors[0].contains("1/2"));
    }

    #[test]
    fn test_quorum_custom_message_wins() {
        let set = ScaleSet::new(
            vec![
                scale("Joy", ScaleKind::Slider, Some("emotions"), true),
                scale("Anger", ScaleKind::Slider, Some("emotions"), true),
            ],
            vec![emotions_group(2, "Pick at least two emotions, please.")],
        );

        let submitted = BTreeMap::from([("Joy".to_string(), json!(10.0))]);

        let errors = validate(&submitted, &set);
        assert_eq!(errors, vec!["Pick at least two emotions, please.".to_string()]);
    }

    #[test]
    fn test_required_text_empty_with_satisfied_group() {
        let set = ScaleSet::new(
            vec![
                scale("Comments", ScaleKind::Text, None, true),
                scale("Joy", ScaleKind::Slider, Some("emotions"), true),
            ],
            vec![emotions_group(1, "")],
        );

        let submitted = BTreeMap::from([
            ("Comments".to_string(), json!("")),
            ("Joy".to_string(), json!(77.0)),
        ]);

        let errors = validate(&submitted, &set);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Comments"));
        assert!(!errors[0].contains("Joy"));
    }

    #[test]
    fn test_clean_submission_passes() {
        let set = ScaleSet::new(
            vec![
                scale("Outcome", ScaleKind::Discrete, None, true),
                scale("Joy", ScaleKind::Slider, Some("emotions"), true),
                scale("Anger", ScaleKind::Slider, Some("emotions"), true),
            ],
            vec![emotions_group(2, "")],
        );

        let submitted = BTreeMap::from([
            ("Outcome".to_string(), json!("win")),
            ("Joy".to_string(), json!(15.0)),
            ("Anger".to_string(), json!(90.0)),
        ]);

        assert!(validate(&submitted, &set).is_empty());
    }

    #[test]
    fn test_discrete_zero_is_an_answer() {
        let set = ScaleSet::new(
            vec![scale("Intensity", ScaleKind::Discrete, None, true)],
            vec![],
        );
        let submitted = BTreeMap::from([("Intensity".to_string(), json!(0))]);
        assert!(validate(&submitted, &set).is_empty());
    }

    #[test]
    fn test_optional_scale_may_stay_empty() {
        let set = ScaleSet::new(
            vec![scale("Remarks", ScaleKind::Text, None, false)],
            vec![],
        );
        assert!(validate(&BTreeMap::new(), &set).is_empty());
    }
}
