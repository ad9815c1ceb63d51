use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_models::auth::{Role, User};
use shared_models::error::ServiceError;

use crate::models::{DaySlots, Doctor, DoctorProfile};
use crate::services::slots::{open_slots, DEFAULT_DAYS};
use crate::store::DoctorStore;

pub struct DoctorService {
    doctors: Arc<dyn DoctorStore>,
}

impl DoctorService {
    pub fn new(doctors: Arc<dyn DoctorStore>) -> Self {
        Self { doctors }
    }

    /// Get doctor by ID, including the booked-slot map
    pub async fn get_doctor(&self, doctor_id: Uuid) -> Result<Doctor, ServiceError> {
        debug!("Fetching doctor profile: {}", doctor_id);

        self.doctors
            .find_doctor(doctor_id)
            .await
            .map_err(ServiceError::store)?
            .ok_or_else(|| ServiceError::NotFound("Doctor".to_string()))
    }

    pub async fn list_doctors(&self) -> Result<Vec<DoctorProfile>, ServiceError> {
        self.doctors.list_doctors().await.map_err(ServiceError::store)
    }

    pub async fn available_slots(
        &self,
        doctor_id: Uuid,
        days: Option<u32>,
        now: NaiveDateTime,
    ) -> Result<Vec<DaySlots>, ServiceError> {
        let doctor = self.get_doctor(doctor_id).await?;
        Ok(open_slots(&doctor, now, days.unwrap_or(DEFAULT_DAYS)))
    }

    /// Toggle whether a doctor takes new bookings. Doctors may only change their own
    /// flag; admins may change anyone's.
    pub async fn change_availability(
        &self,
        doctor_id: Uuid,
        requester: &User,
        available: bool,
    ) -> Result<DoctorProfile, ServiceError> {
        let allowed = match requester.role() {
            Role::Admin => true,
            Role::Doctor => requester.id == doctor_id.to_string(),
            Role::Patient => false,
        };
        if !allowed {
            warn!("User {} attempted to change availability of doctor {}", requester.id, doctor_id);
            return Err(ServiceError::Unauthorized(
                "Not authorized to change this doctor's availability".to_string(),
            ));
        }

        let profile = self
            .doctors
            .set_availability(doctor_id, available)
            .await
            .map_err(ServiceError::store)?
            .ok_or_else(|| ServiceError::NotFound("Doctor".to_string()))?;

        info!("Doctor {} availability set to {}", doctor_id, available);
        Ok(profile)
    }
}
