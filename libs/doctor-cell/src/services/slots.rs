use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::models::{DaySlots, Doctor};
use crate::slot_time::{format_display, SlotKey};

pub const DEFAULT_DAYS: u32 = 7;
pub const MAX_DAYS: u32 = 30;

const OPENING_MINUTES: i64 = 10 * 60;
const CLOSING_MINUTES: i64 = 21 * 60;
const SLOT_MINUTES: i64 = 30;

/// `d_m_yyyy`, the day key clients use for `slots_booked`.
pub fn date_key(date: NaiveDate) -> String {
    date.format("%-d_%-m_%Y").to_string()
}

/// Bookable half-hour slots from opening to closing for `days` days starting at `now`.
/// Today starts at the first half-hour boundary after `now`. Days with nothing open are
/// left out, and a doctor who is not taking appointments has no open slots at all.
pub fn open_slots(doctor: &Doctor, now: NaiveDateTime, days: u32) -> Vec<DaySlots> {
    if !doctor.is_available() {
        return Vec::new();
    }

    let today = now.date();
    (0..days.min(MAX_DAYS))
        .filter_map(|offset| {
            let date = today + Duration::days(offset as i64);
            let midnight = date.and_time(NaiveTime::default());
            let closing = midnight + Duration::minutes(CLOSING_MINUTES);

            let mut cursor = midnight + Duration::minutes(OPENING_MINUTES);
            if offset == 0 {
                cursor = cursor.max(next_boundary(now));
            }

            let slot_date = date_key(date);
            let mut times = Vec::new();
            while cursor < closing {
                let display = format_display(cursor.time());
                if !doctor.slots_booked.is_booked(&slot_date, &SlotKey::from_display(&display)) {
                    times.push(display);
                }
                cursor += Duration::minutes(SLOT_MINUTES);
            }

            (!times.is_empty()).then_some(DaySlots { slot_date, date, times })
        })
        .collect()
}

fn next_boundary(now: NaiveDateTime) -> NaiveDateTime {
    let minute_of_day = (now.hour() * 60 + now.minute()) as i64;
    let next = (minute_of_day / SLOT_MINUTES + 1) * SLOT_MINUTES;
    now.date().and_time(NaiveTime::default()) + Duration::minutes(next)
}
