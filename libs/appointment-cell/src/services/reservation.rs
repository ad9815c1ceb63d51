use std::sync::Arc;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use doctor_cell::{ClaimOutcome, DoctorStore, ReleaseOutcome, SlotKey};
use patient_cell::UserStore;
use shared_models::error::ServiceError;

use crate::models::{Appointment, BookAppointmentRequest, Requester};
use crate::store::{AppointmentGuard, AppointmentPatch, AppointmentStore, ConditionalUpdate};

/// Books and frees doctor slots. The doctor's `slots_booked` map and the set of
/// non-cancelled appointments are kept in step: a slot is claimed before the
/// appointment exists and released only by the cancellation that actually landed.
pub struct SlotReservationService {
    doctors: Arc<dyn DoctorStore>,
    appointments: Arc<dyn AppointmentStore>,
    users: Arc<dyn UserStore>,
}

#[derive(Debug)]
struct SlotRequest {
    doctor_id: Uuid,
    slot_date: String,
    slot_time: String,
}

impl SlotReservationService {
    pub fn new(
        doctors: Arc<dyn DoctorStore>,
        appointments: Arc<dyn AppointmentStore>,
        users: Arc<dyn UserStore>,
    ) -> Self {
        Self { doctors, appointments, users }
    }

    pub async fn reserve(
        &self,
        user_id: Uuid,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, ServiceError> {
        let SlotRequest { doctor_id, slot_date, slot_time } = validate_request(request)?;
        debug!("Reserving {} {} with doctor {} for user {}", slot_date, slot_time, doctor_id, user_id);

        let doctor = self
            .doctors
            .find_doctor(doctor_id)
            .await
            .map_err(ServiceError::store)?
            .ok_or_else(|| ServiceError::NotFound("Doctor".to_string()))?;

        if !doctor.is_available() {
            return Err(ServiceError::DoctorUnavailable);
        }

        let key = SlotKey::from_display(&slot_time);
        let booked = self
            .appointments
            .active_for_doctor_on(doctor_id, &slot_date)
            .await
            .map_err(ServiceError::store)?;
        if booked.iter().any(|appointment| appointment.slot_key() == key)
            || doctor.slots_booked.is_booked(&slot_date, &key)
        {
            return Err(ServiceError::SlotTaken);
        }

        match self
            .doctors
            .claim_slot(doctor_id, &slot_date, &slot_time)
            .await
            .map_err(ServiceError::store)?
        {
            ClaimOutcome::Claimed => {}
            ClaimOutcome::AlreadyBooked => return Err(ServiceError::SlotTaken),
            ClaimOutcome::DoctorUnavailable => return Err(ServiceError::DoctorUnavailable),
        }

        // From here on the slot is ours; every failure must hand it back.
        let appointment = match self.build_appointment(user_id, doctor_id, &slot_date, &slot_time).await {
            Ok(appointment) => appointment,
            Err(e) => {
                self.release_claim(doctor_id, &slot_date, &slot_time).await;
                return Err(e);
            }
        };

        match self.appointments.create_appointment(&appointment).await {
            Ok(created) => {
                info!("Appointment {} booked with doctor {} at {} {}", created.id, doctor_id, slot_date, slot_time);
                Ok(created)
            }
            Err(e) => {
                self.release_claim(doctor_id, &slot_date, &slot_time).await;
                Err(ServiceError::store(e))
            }
        }
    }

    pub async fn cancel(
        &self,
        appointment_id: Uuid,
        requester: &Requester,
    ) -> Result<Appointment, ServiceError> {
        let appointment = self
            .appointments
            .find_appointment(appointment_id)
            .await
            .map_err(ServiceError::store)?
            .ok_or_else(|| ServiceError::NotFound("Appointment".to_string()))?;

        if !requester.owns(&appointment) {
            warn!("{:?} attempted to cancel appointment {}", requester, appointment_id);
            return Err(ServiceError::Unauthorized("Not authorized to cancel this appointment".to_string()));
        }

        let cancelled = match self
            .appointments
            .update_if(appointment_id, AppointmentGuard::active(), &AppointmentPatch::cancel())
            .await
            .map_err(ServiceError::store)?
        {
            ConditionalUpdate::Applied(cancelled) => cancelled,
            ConditionalUpdate::Skipped(current) => {
                debug!("Appointment {} was already cancelled", appointment_id);
                return Ok(current);
            }
            ConditionalUpdate::Missing => return Err(ServiceError::NotFound("Appointment".to_string())),
        };

        self.release_claim(cancelled.doc_id, &cancelled.slot_date, &cancelled.slot_time)
            .await;

        info!("Appointment {} cancelled", appointment_id);
        Ok(cancelled)
    }

    async fn build_appointment(
        &self,
        user_id: Uuid,
        doctor_id: Uuid,
        slot_date: &str,
        slot_time: &str,
    ) -> Result<Appointment, ServiceError> {
        let doctor = self
            .doctors
            .find_doctor(doctor_id)
            .await
            .map_err(ServiceError::store)?
            .ok_or_else(|| ServiceError::NotFound("Doctor".to_string()))?;

        let user = self
            .users
            .find_user(user_id)
            .await
            .map_err(ServiceError::store)?
            .ok_or_else(|| ServiceError::NotFound("User".to_string()))?;

        Ok(Appointment::new(user, doctor.snapshot(), slot_date, slot_time))
    }

    /// Best effort: the caller's outcome does not depend on it.
    async fn release_claim(&self, doctor_id: Uuid, slot_date: &str, slot_time: &str) {
        match self.doctors.release_slot(doctor_id, slot_date, slot_time).await {
            Ok(ReleaseOutcome::Released) => {
                debug!("Released slot {} {} of doctor {}", slot_date, slot_time, doctor_id);
            }
            Ok(ReleaseOutcome::NotBooked) => {
                warn!("Slot {} {} of doctor {} was not booked", slot_date, slot_time, doctor_id);
            }
            Ok(ReleaseOutcome::DoctorMissing) => {
                warn!("Doctor {} vanished before slot {} {} was released", doctor_id, slot_date, slot_time);
            }
            Err(e) => {
                error!("Failed to release slot {} {} of doctor {}: {}", slot_date, slot_time, doctor_id, e);
            }
        }
    }
}

fn validate_request(request: BookAppointmentRequest) -> Result<SlotRequest, ServiceError> {
    fn required(value: Option<String>, field: &str) -> Result<String, ServiceError> {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ServiceError::InvalidRequest(format!("Missing {}", field)))
    }

    let doc_id = required(request.doc_id, "doc_id")?;
    let slot_date = required(request.slot_date, "slot_date")?;
    let slot_time = required(request.slot_time, "slot_time")?;

    let doctor_id = Uuid::parse_str(&doc_id)
        .map_err(|_| ServiceError::InvalidRequest("Invalid doc_id".to_string()))?;

    Ok(SlotRequest { doctor_id, slot_date, slot_time })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn request(doc_id: Option<&str>, date: Option<&str>, time: Option<&str>) -> BookAppointmentRequest {
        BookAppointmentRequest {
            doc_id: doc_id.map(str::to_string),
            slot_date: date.map(str::to_string),
            slot_time: time.map(str::to_string),
        }
    }

    #[test]
    fn blank_or_missing_fields_are_invalid() {
        let id = Uuid::new_v4().to_string();

        assert_matches!(
            validate_request(request(None, Some("5_6_2024"), Some("10:00 AM"))),
            Err(ServiceError::InvalidRequest(_))
        );
        assert_matches!(
            validate_request(request(Some(&id), Some("  "), Some("10:00 AM"))),
            Err(ServiceError::InvalidRequest(_))
        );
        assert_matches!(
            validate_request(request(Some(&id), Some("5_6_2024"), None)),
            Err(ServiceError::InvalidRequest(_))
        );
        assert_matches!(
            validate_request(request(Some("not-a-uuid"), Some("5_6_2024"), Some("10:00 AM"))),
            Err(ServiceError::InvalidRequest(_))
        );
    }

    #[test]
    fn valid_request_is_trimmed() {
        let id = Uuid::new_v4();
        let slot = validate_request(request(Some(&id.to_string()), Some(" 5_6_2024 "), Some("10:00 AM ")))
            .unwrap();

        assert_eq!(slot.doctor_id, id);
        assert_eq!(slot.slot_date, "5_6_2024");
        assert_eq!(slot.slot_time, "10:00 AM");
    }
}
