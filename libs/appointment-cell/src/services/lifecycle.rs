use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_models::error::ServiceError;

use crate::models::{Appointment, DoctorDashboard, Requester};
use crate::store::{AppointmentGuard, AppointmentPatch, AppointmentStore, ConditionalUpdate};

const DASHBOARD_LATEST: usize = 5;

pub struct AppointmentLifecycleService {
    appointments: Arc<dyn AppointmentStore>,
}

impl AppointmentLifecycleService {
    pub fn new(appointments: Arc<dyn AppointmentStore>) -> Self {
        Self { appointments }
    }

    /// Marks a consultation as held. Only the treating doctor or an admin may do this,
    /// and a cancelled appointment stays cancelled. The slot remains booked.
    pub async fn complete(
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

        let allowed = matches!(requester, Requester::Doctor(_) | Requester::Admin) && requester.owns(&appointment);
        if !allowed {
            warn!("{:?} attempted to complete appointment {}", requester, appointment_id);
            return Err(ServiceError::Unauthorized("Not authorized to complete this appointment".to_string()));
        }

        if appointment.cancelled {
            return Err(ServiceError::Cancelled);
        }

        match self
            .appointments
            .update_if(appointment_id, AppointmentGuard::active(), &AppointmentPatch::complete())
            .await
            .map_err(ServiceError::store)?
        {
            ConditionalUpdate::Applied(completed) => {
                info!("Appointment {} completed", appointment_id);
                Ok(completed)
            }
            ConditionalUpdate::Skipped(_) => Err(ServiceError::Cancelled),
            ConditionalUpdate::Missing => Err(ServiceError::NotFound("Appointment".to_string())),
        }
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Appointment>, ServiceError> {
        self.appointments
            .list_for_user(user_id)
            .await
            .map_err(ServiceError::store)
    }

    pub async fn list_for_doctor(&self, requester: &Requester) -> Result<Vec<Appointment>, ServiceError> {
        let doctor_id = requester.doctor_id()?;
        self.appointments
            .list_for_doctor(doctor_id)
            .await
            .map_err(ServiceError::store)
    }

    pub async fn list_all(&self, requester: &Requester) -> Result<Vec<Appointment>, ServiceError> {
        if *requester != Requester::Admin {
            return Err(ServiceError::Unauthorized("Admin access required".to_string()));
        }
        self.appointments.list_all().await.map_err(ServiceError::store)
    }

    pub async fn doctor_dashboard(&self, requester: &Requester) -> Result<DoctorDashboard, ServiceError> {
        let appointments = self.list_for_doctor(requester).await?;
        debug!("Building dashboard over {} appointments", appointments.len());

        Ok(summarize(appointments))
    }
}

/// `appointments` must be newest first.
fn summarize(appointments: Vec<Appointment>) -> DoctorDashboard {
    let earnings = appointments
        .iter()
        .filter(|a| a.is_billable())
        .map(|a| a.amount)
        .sum();
    let patients = appointments
        .iter()
        .map(|a| a.user_id)
        .collect::<HashSet<_>>()
        .len();

    DoctorDashboard {
        earnings,
        appointments: appointments.len(),
        patients,
        latest_appointments: appointments.into_iter().take(DASHBOARD_LATEST).collect(),
    }
}
