use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use doctor_cell::{DoctorProfile, SlotKey};
use patient_cell::Patient;
use shared_models::auth::{Role, User};
use shared_models::error::ServiceError;

// ==============================================================================
// APPOINTMENT
// ==============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    None,
    Completed,
    Failed,
}

/// A booked consultation. `user_data` and `doc_data` are snapshots taken at booking
/// time and are never refreshed. Records are never deleted; `cancelled` is terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub doc_id: Uuid,
    pub user_data: Patient,
    pub doc_data: DoctorProfile,
    pub slot_date: String,
    pub slot_time: String,
    pub amount: f64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub cancelled: bool,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub payment: bool,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub payment_intent_id: Option<String>,
    #[serde(default)]
    pub payment_date: Option<DateTime<Utc>>,
}

impl Appointment {
    pub fn new(user: Patient, doctor: DoctorProfile, slot_date: &str, slot_time: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user.id,
            doc_id: doctor.id,
            amount: doctor.fees,
            user_data: user,
            doc_data: doctor,
            slot_date: slot_date.to_string(),
            slot_time: slot_time.to_string(),
            created_at: Utc::now(),
            cancelled: false,
            is_completed: false,
            payment: false,
            payment_status: PaymentStatus::None,
            payment_intent_id: None,
            payment_date: None,
        }
    }

    pub fn slot_key(&self) -> SlotKey {
        SlotKey::from_display(&self.slot_time)
    }

    /// Counts toward a doctor's earnings.
    pub fn is_billable(&self) -> bool {
        !self.cancelled && (self.is_completed || self.payment)
    }
}

// ==============================================================================
// REQUESTER
// ==============================================================================

/// The authenticated caller, as far as appointment ownership is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requester {
    Patient(Uuid),
    Doctor(Uuid),
    Admin,
}

impl Requester {
    pub fn from_user(user: &User) -> Result<Self, ServiceError> {
        if user.is_admin() {
            return Ok(Requester::Admin);
        }

        let id = user_uuid(user)?;
        Ok(match user.role() {
            Role::Doctor => Requester::Doctor(id),
            _ => Requester::Patient(id),
        })
    }

    /// Patients own their bookings, doctors own the bookings made with them.
    pub fn owns(&self, appointment: &Appointment) -> bool {
        match self {
            Requester::Patient(id) => appointment.user_id == *id,
            Requester::Doctor(id) => appointment.doc_id == *id,
            Requester::Admin => true,
        }
    }

    pub fn doctor_id(&self) -> Result<Uuid, ServiceError> {
        match self {
            Requester::Doctor(id) => Ok(*id),
            _ => Err(ServiceError::Unauthorized("Doctor access required".to_string())),
        }
    }
}

/// Token subjects are Supabase user ids; anything else cannot own records.
pub fn user_uuid(user: &User) -> Result<Uuid, ServiceError> {
    Uuid::parse_str(&user.id)
        .map_err(|_| ServiceError::Unauthorized("Invalid user identity".to_string()))
}

// ==============================================================================
// REQUEST / RESPONSE TYPES
// ==============================================================================

/// Fields are optional so that a missing one is reported as `INVALID_REQUEST`
/// instead of a deserialization rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookAppointmentRequest {
    pub doc_id: Option<String>,
    pub slot_date: Option<String>,
    pub slot_time: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DoctorDashboard {
    pub earnings: f64,
    pub appointments: usize,
    pub patients: usize,
    pub latest_appointments: Vec<Appointment>,
}
