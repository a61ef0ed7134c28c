// cliprate-core/src/domain/device.rs
//
// User-Agent + client-signal sniffing for the device metadata attached to
// rating records. Evaluated once per session and cached by the session owner.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Best-effort signals reported by the front end (viewport, touch, screen).
/// All optional: they may be absent on the first render.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
pub struct ClientSignals {
    pub inner_width: Option<i64>,
    pub inner_height: Option<i64>,
    pub max_touch_points: Option<i64>,
    pub screen_width: Option<i64>,
    pub screen_height: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DeviceInfo {
    pub device_type: String,
    pub os: String,
    pub os_version: String,
    pub browser: String,
    pub browser_version: String,
    pub window_inner_width: Option<i64>,
    pub window_inner_height: Option<i64>,
    pub max_touch_points: Option<i64>,
    pub screen_width: Option<i64>,
    pub screen_height: Option<i64>,
    pub user_agent: String,
}

impl DeviceInfo {
    /// Classify a raw User-Agent string plus optional client signals.
    pub fn detect(user_agent: &str, signals: ClientSignals) -> Self {
        let (os, os_version) = parse_os(user_agent);
        let (browser, browser_version) = parse_browser(user_agent);
        let mut device_type = classify_device(user_agent).to_string();

        // iPads on iPadOS 13+ masquerade as macOS desktops. Touch support on
        // a "Mac" with a tablet-sized viewport gives them away; the width cap
        // avoids relabeling large touch-enabled desktops.
        let width = signals.inner_width.unwrap_or(10_000);
        let touch = signals.max_touch_points.unwrap_or(0);
        if device_type == "laptop/desktop" && os.starts_with("Mac") && touch > 0 && width <= 1366 {
            device_type = "tablet (likely iPad)".to_string();
        }

        Self {
            device_type,
            os,
            os_version,
            browser,
            browser_version,
            window_inner_width: signals.inner_width,
            window_inner_height: signals.inner_height,
            max_touch_points: signals.max_touch_points,
            screen_width: signals.screen_width,
            screen_height: signals.screen_height,
            user_agent: user_agent.to_string(),
        }
    }
}

fn classify_device(ua: &str) -> &'static str {
    if ua.contains("iPad") || (ua.contains("Android") && !ua.contains("Mobile")) {
        "tablet"
    } else if ua.contains("iPhone") || ua.contains("Mobile") || ua.contains("Mobi") {
        "smartphone"
    } else if ua.contains("Windows NT") || ua.contains("Macintosh") || ua.contains("Linux") {
        "laptop/desktop"
    } else {
        "unknown"
    }
}

fn parse_os(ua: &str) -> (String, String) {
    let patterns: &[(&str, &str)] = &[
        ("iOS", r"iPhone OS (\d+[_\.]\d+(?:[_\.]\d+)?)"),
        ("iOS", r"CPU OS (\d+[_\.]\d+(?:[_\.]\d+)?)"),
        ("Android", r"Android (\d+(?:\.\d+)*)"),
        ("Windows", r"Windows NT (\d+(?:\.\d+)*)"),
        ("Mac OS X", r"Mac OS X (\d+[_\.]\d+(?:[_\.]\d+)?)"),
    ];

    for (family, pattern) in patterns {
        if let Ok(re) = Regex::new(pattern) {
            if let Some(caps) = re.captures(ua) {
                let version = caps[1].replace('_', ".");
                return (family.to_string(), version);
            }
        }
    }

    if ua.contains("Linux") {
        return ("Linux".to_string(), String::new());
    }
    ("Other".to_string(), String::new())
}

fn parse_browser(ua: &str) -> (String, String) {
    // Order matters: Chromium forks carry a Chrome/ token too.
    let patterns: &[(&str, &str)] = &[
        ("Edge", r"Edg/(\d+(?:\.\d+)*)"),
        ("Opera", r"OPR/(\d+(?:\.\d+)*)"),
        ("Firefox", r"Firefox/(\d+(?:\.\d+)*)"),
        ("Chrome", r"Chrome/(\d+(?:\.\d+)*)"),
        ("Safari", r"Version/(\d+(?:\.\d+)*).*Safari"),
    ];

    for (family, pattern) in patterns {
        if let Ok(re) = Regex::new(pattern) {
            if let Some(caps) = re.captures(ua) {
                return (family.to_string(), caps[1].to_string());
            }
        }
    }
    ("Other".to_string(), String::new())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const CHROME_WIN: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
        (KHTML, like Gecko) Chrome/128.0.0.0 Safari/537.36";
    const SAFARI_IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_5 like Mac OS X) \
        AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Mobile/15E148 Safari/604.1";
    const IPAD_AS_MAC: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
        AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Safari/605.1.15";

    #[test]
    fn test_desktop_chrome() {
        let info = DeviceInfo::detect(CHROME_WIN, ClientSignals::default());
        assert_eq!(info.device_type, "laptop/desktop");
        assert_eq!(info.os, "Windows");
        assert_eq!(info.os_version, "10.0");
        assert_eq!(info.browser, "Chrome");
        assert!(info.browser_version.starts_with("128"));
    }

    #[test]
    fn test_iphone_safari() {
        let info = DeviceInfo::detect(SAFARI_IPHONE, ClientSignals::default());
        assert_eq!(info.device_type, "smartphone");
        assert_eq!(info.os, "iOS");
        assert_eq!(info.os_version, "17.5");
        assert_eq!(info.browser, "Safari");
    }

    #[test]
    fn test_ipad_as_mac_heuristic() {
        let signals = ClientSignals {
            inner_width: Some(1024),
            max_touch_points: Some(5),
            ..Default::default()
        };
        let info = DeviceInfo::detect(IPAD_AS_MAC, signals);
        assert_eq!(info.device_type, "tablet (likely iPad)");

        // Same UA, no touch: a real Mac stays a desktop.
        let info = DeviceInfo::detect(IPAD_AS_MAC, ClientSignals::default());
        assert_eq!(info.device_type, "laptop/desktop");
    }

    #[test]
    fn test_unknown_ua() {
        let info = DeviceInfo::detect("curl/8.5.0", ClientSignals::default());
        assert_eq!(info.device_type, "unknown");
        assert_eq!(info.browser, "Other");
    }
}
