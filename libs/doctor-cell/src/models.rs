use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::slot_time::SlotKey;

// ==============================================================================
// DOCTOR RECORD
// ==============================================================================

/// Public doctor data. This is also the snapshot embedded into appointments, so it
/// deliberately carries neither the booked-slot map nor the concurrency version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoctorProfile {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub speciality: Option<String>,
    #[serde(default)]
    pub degree: Option<String>,
    #[serde(default)]
    pub experience: Option<String>,
    #[serde(default)]
    pub about: Option<String>,
    pub fees: f64,
    #[serde(default)]
    pub address: Value,
    pub available: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    #[serde(flatten)]
    pub profile: DoctorProfile,
    #[serde(default)]
    pub slots_booked: BookedSlots,
    /// Bumped on every slot mutation; compare-and-set token for the row.
    #[serde(default)]
    pub version: i64,
}

impl Doctor {
    pub fn new(id: Uuid, name: &str, fees: f64) -> Self {
        Self {
            profile: DoctorProfile {
                id,
                name: name.to_string(),
                email: None,
                image: None,
                speciality: None,
                degree: None,
                experience: None,
                about: None,
                fees,
                address: Value::Null,
                available: true,
                created_at: Some(Utc::now()),
            },
            slots_booked: BookedSlots::default(),
            version: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.profile.id
    }

    pub fn is_available(&self) -> bool {
        self.profile.available
    }

    pub fn snapshot(&self) -> DoctorProfile {
        self.profile.clone()
    }
}

// ==============================================================================
// BOOKED SLOTS
// ==============================================================================

/// `slot_date -> [display time]`, mirrored from the non-cancelled appointments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookedSlots(BTreeMap<String, Vec<String>>);

impl BookedSlots {
    pub fn times_on(&self, slot_date: &str) -> &[String] {
        self.0.get(slot_date).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_booked(&self, slot_date: &str, key: &SlotKey) -> bool {
        self.times_on(slot_date).iter().any(|time| key.matches(time))
    }

    /// Adds `slot_time` unless an equivalent time is already present.
    pub fn claim(&mut self, slot_date: &str, slot_time: &str) -> bool {
        let key = SlotKey::from_display(slot_time);
        if self.is_booked(slot_date, &key) {
            return false;
        }
        self.0
            .entry(slot_date.to_string())
            .or_default()
            .push(slot_time.to_string());
        true
    }

    /// Removes every time equivalent to `slot_time`; empty date buckets are dropped.
    pub fn release(&mut self, slot_date: &str, slot_time: &str) -> bool {
        let key = SlotKey::from_display(slot_time);
        let Some(times) = self.0.get_mut(slot_date) else {
            return false;
        };

        let before = times.len();
        times.retain(|time| !key.matches(time));
        let removed = times.len() != before;

        if times.is_empty() {
            self.0.remove(slot_date);
        }
        removed
    }

    pub fn dates(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }
}

impl<const N: usize> From<[(&str, &[&str]); N]> for BookedSlots {
    fn from(entries: [(&str, &[&str]); N]) -> Self {
        Self(
            entries
                .into_iter()
                .map(|(date, times)| {
                    (date.to_string(), times.iter().map(|t| t.to_string()).collect())
                })
                .collect(),
        )
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeAvailabilityRequest {
    pub available: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AvailableSlotsQuery {
    pub days: Option<u32>,
}

/// Open slots of one calendar day, keyed the way clients key `slots_booked`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySlots {
    pub slot_date: String,
    pub date: NaiveDate,
    pub times: Vec<String>,
}
