use crate::types::{DeviceType, OsFamily};

/// Coarse device/OS classification from the user agent.
///
/// Order matters: iPad first (including iPadOS Safari, which reports itself
/// as a Mac but has touch points), then iPhone and Android, else desktop.
pub fn classify(user_agent: Option<&str>, max_touch_points: u32) -> (DeviceType, OsFamily) {
    let Some(ua) = user_agent.filter(|ua| !ua.trim().is_empty()) else {
        return (DeviceType::Unknown, OsFamily::Unknown);
    };

    let is_ipad = ua.contains("iPad") || (ua.contains("Macintosh") && max_touch_points > 1);
    if is_ipad {
        return (DeviceType::Tablet, OsFamily::Ios);
    }
    if ua.contains("iPhone") {
        return (DeviceType::Mobile, OsFamily::Ios);
    }
    if ua.contains("Android") {
        return (DeviceType::Mobile, OsFamily::Android);
    }

    (DeviceType::Desktop, OsFamily::Unknown)
}
