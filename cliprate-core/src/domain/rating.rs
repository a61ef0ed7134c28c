// cliprate-core/src/domain/rating.rs
//
// Builds the flat record persisted once per (user, video) submission.
// Append-only: a pair never produces a second record.

use serde_json::Value;
use std::collections::BTreeMap;

use crate::domain::device::DeviceInfo;

/// Scale titles become record keys: lowercased, spaces to underscores.
pub fn snake_case_key(title: &str) -> String {
    title.to_lowercase().replace(' ', "_")
}

/// Flatten one submission into a persistence record. Backends append their
/// own timestamp column on write.
pub fn build_rating_record(
    user_id: &str,
    action_id: &str,
    scale_values: &BTreeMap<String, Value>,
    device: Option<&DeviceInfo>,
) -> BTreeMap<String, Value> {
    let mut record = BTreeMap::new();
    record.insert("user_id".to_string(), Value::String(user_id.to_string()));
    record.insert("id".to_string(), Value::String(action_id.to_string()));

    for (title, value) in scale_values {
        record.insert(snake_case_key(title), value.clone());
    }

    if let Some(device) = device {
        record.insert("device_type".into(), Value::String(device.device_type.clone()));
        record.insert("os".into(), Value::String(device.os.clone()));
        record.insert("browser".into(), Value::String(device.browser.clone()));
        record.insert(
            "browser_version".into(),
            Value::String(device.browser_version.clone()),
        );
        // Key kept camelCased for continuity with previously collected rows.
        record.insert(
            "maxTouchPoints".into(),
            device.max_touch_points.map_or(Value::Null, Value::from),
        );
        record.insert(
            "screen_width".into(),
            device.screen_width.map_or(Value::Null, Value::from),
        );
        record.insert(
            "screen_height".into(),
            device.screen_height.map_or(Value::Null, Value::from),
        );
        record.insert("user_agent".into(), Value::String(device.user_agent.clone()));
    }

    record
}

/// Deterministic natural key for the local backend: `{user_id}_{action_id}`.
pub fn rating_file_stem(user_id: &str, action_id: &str) -> String {
    format!("{}_{}", user_id, action_id)
}
