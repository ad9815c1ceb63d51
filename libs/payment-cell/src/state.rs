use std::sync::Arc;

use appointment_cell::AppointmentStore;
use doctor_cell::DoctorStore;
use shared_config::AppConfig;

use crate::services::{PaymentProcessor, PaymentReconciliationService};

pub struct PaymentState {
    pub config: Arc<AppConfig>,
    pub doctors: Arc<dyn DoctorStore>,
    pub appointments: Arc<dyn AppointmentStore>,
    pub processor: Arc<dyn PaymentProcessor>,
}

impl PaymentState {
    pub fn reconciliation(&self) -> PaymentReconciliationService {
        PaymentReconciliationService::new(
            self.doctors.clone(),
            self.appointments.clone(),
            self.processor.clone(),
            &self.config.payment_currency,
        )
    }
}
