//! Comparison keys for booked slot times.
//!
//! Slot times travel as display strings ("10:00 AM"). Clients are not consistent about
//! case, spacing or a leading zero, so two strings name the same slot when their
//! [`SlotKey`]s are equal. Keys are only ever compared; the display string is what gets
//! stored.

use chrono::{NaiveTime, Timelike};

const CLOCK_FORMATS: [&str; 2] = ["%I:%M%p", "%H:%M"];

/// Lowercases, removes all whitespace and strips a single leading zero.
pub fn normalize_time(raw: &str) -> String {
    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();

    match compact.strip_prefix('0') {
        Some(rest) => rest.to_string(),
        None => compact,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SlotKey {
    /// Minutes since midnight.
    Clock(u16),
    /// Normalized text for values that do not read as a clock time.
    Text(String),
}

impl SlotKey {
    pub fn from_display(raw: &str) -> Self {
        let normalized = normalize_time(raw);

        match clock_minutes(&normalized) {
            Some(minutes) => SlotKey::Clock(minutes),
            None => SlotKey::Text(normalized),
        }
    }

    pub fn matches(&self, raw: &str) -> bool {
        *self == SlotKey::from_display(raw)
    }
}

fn clock_minutes(normalized: &str) -> Option<u16> {
    // "10:00a.m." reads as "10:00am".
    let undotted = normalized
        .trim_end_matches('.')
        .replace("a.m", "am")
        .replace("p.m", "pm");

    // chrono wants minutes, so "9am" is read as "9:00am".
    let with_minutes = match undotted
        .strip_suffix("am")
        .or_else(|| undotted.strip_suffix("pm"))
    {
        Some(hour) if !hour.is_empty() && hour.chars().all(|c| c.is_ascii_digit()) => {
            format!("{}:00{}", hour, &undotted[hour.len()..])
        }
        _ => undotted.clone(),
    };

    CLOCK_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(&with_minutes, format).ok())
        .map(|time| (time.hour() * 60 + time.minute()) as u16)
}

/// Display form used when the server generates slots ("09:30 AM").
pub fn format_display(time: NaiveTime) -> String {
    time.format("%I:%M %p").to_string()
}
