use std::sync::Arc;

use doctor_cell::DoctorStore;
use patient_cell::UserStore;
use shared_config::AppConfig;

use crate::store::AppointmentStore;

pub struct AppointmentState {
    pub config: Arc<AppConfig>,
    pub doctors: Arc<dyn DoctorStore>,
    pub appointments: Arc<dyn AppointmentStore>,
    pub users: Arc<dyn UserStore>,
}
