use std::sync::Arc;

use shared_config::AppConfig;

use crate::store::DoctorStore;

pub struct DoctorState {
    pub config: Arc<AppConfig>,
    pub doctors: Arc<dyn DoctorStore>,
}
