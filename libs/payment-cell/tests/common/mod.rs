#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use appointment_cell::{Appointment, InMemoryAppointmentStore};
use doctor_cell::{Doctor, InMemoryDoctorStore};
use patient_cell::Patient;
use payment_cell::{PaymentIntent, PaymentProcessor, PaymentReconciliationService, ProcessorError};

/// In-process processor: intents live in a map and every call is counted.
#[derive(Default)]
pub struct FakeProcessor {
    intents: Mutex<HashMap<String, PaymentIntent>>,
    pub created: AtomicUsize,
    pub retrieved: AtomicUsize,
}

impl FakeProcessor {
    pub fn put_intent(&self, id: &str, amount: i64, status: &str, appointment_id: Uuid) {
        let intent = PaymentIntent {
            id: id.to_string(),
            client_secret: Some(format!("{}_secret", id)),
            amount,
            currency: "usd".to_string(),
            status: status.to_string(),
            metadata: BTreeMap::from([("appointmentId".to_string(), appointment_id.to_string())]),
        };
        self.intents.lock().unwrap().insert(id.to_string(), intent);
    }

    pub fn intent(&self, id: &str) -> Option<PaymentIntent> {
        self.intents.lock().unwrap().get(id).cloned()
    }

    pub fn retrieve_count(&self) -> usize {
        self.retrieved.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentProcessor for FakeProcessor {
    async fn create_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<PaymentIntent, ProcessorError> {
        let n = self.created.fetch_add(1, Ordering::SeqCst);
        let intent = PaymentIntent {
            id: format!("pi_fake_{}", n),
            client_secret: Some(format!("pi_fake_{}_secret", n)),
            amount: amount_minor,
            currency: currency.to_string(),
            status: "requires_payment_method".to_string(),
            metadata: metadata.clone(),
        };
        self.intents.lock().unwrap().insert(intent.id.clone(), intent.clone());
        Ok(intent)
    }

    async fn retrieve_intent(&self, payment_intent_id: &str) -> Result<PaymentIntent, ProcessorError> {
        self.retrieved.fetch_add(1, Ordering::SeqCst);
        self.intents
            .lock()
            .unwrap()
            .get(payment_intent_id)
            .cloned()
            .ok_or_else(|| ProcessorError::Api {
                status: 404,
                message: format!("No such payment_intent: {}", payment_intent_id),
            })
    }
}

pub struct Fixture {
    pub doctors: Arc<InMemoryDoctorStore>,
    pub appointments: Arc<InMemoryAppointmentStore>,
    pub processor: Arc<FakeProcessor>,
    pub appointment: Appointment,
}

impl Fixture {
    pub fn new() -> Self {
        let doctor = Doctor::new(Uuid::new_v4(), "Dr. Richard James", 50.0);
        let patient = Patient::new(Uuid::new_v4(), "Ana Gomez", "ana@example.com");
        let appointment = Appointment::new(patient, doctor.snapshot(), "5_6_2024", "10:00 AM");

        Self {
            doctors: Arc::new(InMemoryDoctorStore::with_doctors([doctor])),
            appointments: Arc::new(InMemoryAppointmentStore::with_appointments([appointment.clone()])),
            processor: Arc::new(FakeProcessor::default()),
            appointment,
        }
    }

    pub fn service(&self) -> PaymentReconciliationService {
        PaymentReconciliationService::new(
            self.doctors.clone(),
            self.appointments.clone(),
            self.processor.clone(),
            "usd",
        )
    }

    pub fn appointment_id(&self) -> Uuid {
        self.appointment.id
    }

    pub fn patient_id(&self) -> Uuid {
        self.appointment.user_id
    }
}
