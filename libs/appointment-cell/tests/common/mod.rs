#![allow(dead_code)]

use std::sync::Arc;

use uuid::Uuid;

use appointment_cell::{BookAppointmentRequest, InMemoryAppointmentStore, SlotReservationService};
use doctor_cell::{Doctor, InMemoryDoctorStore};
use patient_cell::{InMemoryUserStore, Patient};

pub struct Fixture {
    pub doctors: Arc<InMemoryDoctorStore>,
    pub appointments: Arc<InMemoryAppointmentStore>,
    pub users: Arc<InMemoryUserStore>,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
}

impl Fixture {
    pub fn new() -> Self {
        let doctor = Doctor::new(Uuid::new_v4(), "Dr. Richard James", 50.0);
        let patient = Patient::new(Uuid::new_v4(), "Ana Gomez", "ana@example.com");

        Self {
            doctor_id: doctor.id(),
            patient_id: patient.id,
            doctors: Arc::new(InMemoryDoctorStore::with_doctors([doctor])),
            appointments: Arc::new(InMemoryAppointmentStore::new()),
            users: Arc::new(InMemoryUserStore::with_users([patient])),
        }
    }

    pub async fn add_patient(&self, name: &str) -> Uuid {
        let patient = Patient::new(Uuid::new_v4(), name, &format!("{}@example.com", name.to_lowercase()));
        let id = patient.id;
        self.users.insert(patient).await;
        id
    }

    pub fn service(&self) -> SlotReservationService {
        SlotReservationService::new(self.doctors.clone(), self.appointments.clone(), self.users.clone())
    }

    pub fn request(&self, slot_date: &str, slot_time: &str) -> BookAppointmentRequest {
        BookAppointmentRequest {
            doc_id: Some(self.doctor_id.to_string()),
            slot_date: Some(slot_date.to_string()),
            slot_time: Some(slot_time.to_string()),
        }
    }
}
