//! Parsing helpers for "HH:MM" class times.

use chrono::{NaiveTime, Timelike};

/// Parse a 24-hour "HH:MM" class time
pub fn parse_class_time(time: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(time.trim(), "%H:%M").ok()
}

/// Canonical zero-padded "HH:MM" form
pub fn format_class_time(time: NaiveTime) -> String {
    format!("{:02}:{:02}", time.hour(), time.minute())
}

/// Convert a 12-hour time such as "2:30 PM" or "10:00am" to "14:30" / "10:00".
/// Input already in 24-hour form is normalized and returned as-is.
pub fn to_24_hour(time: &str) -> Option<String> {
    let trimmed = time.trim();
    if let Some(parsed) = parse_class_time(trimmed) {
        return Some(format_class_time(parsed));
    }

    let (hours_part, rest) = trimmed.split_once(':')?;
    let hours: u32 = hours_part.trim().parse().ok()?;
    if !(1..=12).contains(&hours) {
        return None;
    }
    let rest = rest.trim();
    if rest.len() < 2 || !rest.is_char_boundary(2) {
        return None;
    }
    let (minutes_part, period) = rest.split_at(2);
    let minutes: u32 = minutes_part.parse().ok()?;

    let hours = match period.trim().to_uppercase().as_str() {
        "AM" if hours == 12 => 0,
        "AM" => hours,
        "PM" if hours == 12 => 12,
        "PM" => hours + 12,
        _ => return None,
    };

    NaiveTime::from_hms_opt(hours, minutes, 0).map(format_class_time)
}
