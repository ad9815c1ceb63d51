use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_database::SupabaseClient;

use crate::models::{Doctor, DoctorProfile};

/// Upper bound on compare-and-set rounds before a slot mutation gives up.
pub const MAX_CAS_ATTEMPTS: usize = 8;

const DOCTOR_COLUMNS: &str =
    "id,name,email,image,speciality,degree,experience,about,fees,address,available,created_at,slots_booked,version";
const PROFILE_COLUMNS: &str =
    "id,name,email,image,speciality,degree,experience,about,fees,address,available,created_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    Claimed,
    /// An equivalent time is already booked for that date.
    AlreadyBooked,
    /// The conditional write matched nothing: the doctor is disabled or gone.
    DoctorUnavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Released,
    NotBooked,
    DoctorMissing,
}

/// Doctor persistence. Slot mutations must be atomic per doctor document: an
/// implementation may never expose a read-modify-write window to other callers.
#[async_trait]
pub trait DoctorStore: Send + Sync {
    async fn find_doctor(&self, doctor_id: Uuid) -> Result<Option<Doctor>>;

    async fn list_doctors(&self) -> Result<Vec<DoctorProfile>>;

    /// Adds `slot_time` to `slots_booked[slot_date]` iff the doctor is available and no
    /// equivalent time is booked, as one atomic step.
    async fn claim_slot(&self, doctor_id: Uuid, slot_date: &str, slot_time: &str) -> Result<ClaimOutcome>;

    /// Removes `slot_time` (and equivalents) from `slots_booked[slot_date]` atomically.
    async fn release_slot(&self, doctor_id: Uuid, slot_date: &str, slot_time: &str) -> Result<ReleaseOutcome>;

    async fn set_availability(&self, doctor_id: Uuid, available: bool) -> Result<Option<DoctorProfile>>;
}

// ==============================================================================
// SUPABASE (PostgREST) BACKEND
// ==============================================================================

/// Slot mutations are compare-and-set on the `version` column: the PATCH is filtered on
/// the version that was read, so it only lands if nobody wrote the row in between.
pub struct SupabaseDoctorStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseDoctorStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

#[async_trait]
impl DoctorStore for SupabaseDoctorStore {
    async fn find_doctor(&self, doctor_id: Uuid) -> Result<Option<Doctor>> {
        debug!("Fetching doctor: {}", doctor_id);

        let path = format!("/rest/v1/doctors?id=eq.{}&select={}", doctor_id, DOCTOR_COLUMNS);
        let mut rows: Vec<Doctor> = self.supabase.select(&path).await?;

        Ok(if rows.is_empty() { None } else { Some(rows.swap_remove(0)) })
    }

    async fn list_doctors(&self) -> Result<Vec<DoctorProfile>> {
        let path = format!("/rest/v1/doctors?select={}&order=created_at.asc", PROFILE_COLUMNS);
        self.supabase.select(&path).await
    }

    async fn claim_slot(&self, doctor_id: Uuid, slot_date: &str, slot_time: &str) -> Result<ClaimOutcome> {
        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let Some(doctor) = self.find_doctor(doctor_id).await? else {
                return Ok(ClaimOutcome::DoctorUnavailable);
            };
            if !doctor.is_available() {
                return Ok(ClaimOutcome::DoctorUnavailable);
            }

            let mut slots = doctor.slots_booked.clone();
            if !slots.claim(slot_date, slot_time) {
                return Ok(ClaimOutcome::AlreadyBooked);
            }

            let path = format!(
                "/rest/v1/doctors?id=eq.{}&version=eq.{}&available=eq.true&select=id",
                doctor_id, doctor.version
            );
            let updated: Vec<serde_json::Value> = self
                .supabase
                .update_where(&path, json!({
                    "slots_booked": slots,
                    "version": doctor.version + 1,
                }))
                .await?;

            if !updated.is_empty() {
                info!("Claimed slot {} {} for doctor {}", slot_date, slot_time, doctor_id);
                return Ok(ClaimOutcome::Claimed);
            }

            debug!(
                "Slot claim for doctor {} lost compare-and-set at version {} (attempt {})",
                doctor_id, doctor.version, attempt
            );
        }

        warn!("Slot claim for doctor {} exhausted {} attempts", doctor_id, MAX_CAS_ATTEMPTS);
        Err(anyhow!("Doctor {} is under heavy contention, slot claim abandoned", doctor_id))
    }

    async fn release_slot(&self, doctor_id: Uuid, slot_date: &str, slot_time: &str) -> Result<ReleaseOutcome> {
        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let Some(doctor) = self.find_doctor(doctor_id).await? else {
                return Ok(ReleaseOutcome::DoctorMissing);
            };

            let mut slots = doctor.slots_booked.clone();
            if !slots.release(slot_date, slot_time) {
                return Ok(ReleaseOutcome::NotBooked);
            }

            let path = format!(
                "/rest/v1/doctors?id=eq.{}&version=eq.{}&select=id",
                doctor_id, doctor.version
            );
            let updated: Vec<serde_json::Value> = self
                .supabase
                .update_where(&path, json!({
                    "slots_booked": slots,
                    "version": doctor.version + 1,
                }))
                .await?;

            if !updated.is_empty() {
                info!("Released slot {} {} for doctor {}", slot_date, slot_time, doctor_id);
                return Ok(ReleaseOutcome::Released);
            }

            debug!(
                "Slot release for doctor {} lost compare-and-set at version {} (attempt {})",
                doctor_id, doctor.version, attempt
            );
        }

        warn!("Slot release for doctor {} exhausted {} attempts", doctor_id, MAX_CAS_ATTEMPTS);
        Err(anyhow!("Doctor {} is under heavy contention, slot release abandoned", doctor_id))
    }

    async fn set_availability(&self, doctor_id: Uuid, available: bool) -> Result<Option<DoctorProfile>> {
        let path = format!("/rest/v1/doctors?id=eq.{}&select={}", doctor_id, PROFILE_COLUMNS);
        let mut rows: Vec<DoctorProfile> = self
            .supabase
            .update_where(&path, json!({ "available": available }))
            .await?;

        Ok(if rows.is_empty() { None } else { Some(rows.swap_remove(0)) })
    }
}

// ==============================================================================
// IN-MEMORY BACKEND
// ==============================================================================

/// Every call is one critical section over the whole map, which gives the same
/// single-document atomicity the Supabase backend gets from compare-and-set.
#[derive(Default)]
pub struct InMemoryDoctorStore {
    doctors: RwLock<HashMap<Uuid, Doctor>>,
}

impl InMemoryDoctorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_doctors(doctors: impl IntoIterator<Item = Doctor>) -> Self {
        Self {
            doctors: RwLock::new(doctors.into_iter().map(|d| (d.id(), d)).collect()),
        }
    }

    pub async fn insert(&self, doctor: Doctor) {
        self.doctors.write().await.insert(doctor.id(), doctor);
    }
}

#[async_trait]
impl DoctorStore for InMemoryDoctorStore {
    async fn find_doctor(&self, doctor_id: Uuid) -> Result<Option<Doctor>> {
        Ok(self.doctors.read().await.get(&doctor_id).cloned())
    }

    async fn list_doctors(&self) -> Result<Vec<DoctorProfile>> {
        let doctors = self.doctors.read().await;
        let mut profiles: Vec<DoctorProfile> = doctors.values().map(Doctor::snapshot).collect();
        profiles.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.name.cmp(&b.name)));
        Ok(profiles)
    }

    async fn claim_slot(&self, doctor_id: Uuid, slot_date: &str, slot_time: &str) -> Result<ClaimOutcome> {
        let mut doctors = self.doctors.write().await;
        let Some(doctor) = doctors.get_mut(&doctor_id).filter(|d| d.is_available()) else {
            return Ok(ClaimOutcome::DoctorUnavailable);
        };

        if !doctor.slots_booked.claim(slot_date, slot_time) {
            return Ok(ClaimOutcome::AlreadyBooked);
        }
        doctor.version += 1;
        Ok(ClaimOutcome::Claimed)
    }

    async fn release_slot(&self, doctor_id: Uuid, slot_date: &str, slot_time: &str) -> Result<ReleaseOutcome> {
        let mut doctors = self.doctors.write().await;
        let Some(doctor) = doctors.get_mut(&doctor_id) else {
            return Ok(ReleaseOutcome::DoctorMissing);
        };

        if !doctor.slots_booked.release(slot_date, slot_time) {
            return Ok(ReleaseOutcome::NotBooked);
        }
        doctor.version += 1;
        Ok(ReleaseOutcome::Released)
    }

    async fn set_availability(&self, doctor_id: Uuid, available: bool) -> Result<Option<DoctorProfile>> {
        let mut doctors = self.doctors.write().await;
        Ok(doctors.get_mut(&doctor_id).map(|doctor| {
            doctor.profile.available = available;
            doctor.snapshot()
        }))
    }
}
