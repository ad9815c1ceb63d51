use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared_database::SupabaseClient;

use crate::models::{Appointment, PaymentStatus};

// ==============================================================================
// CONDITIONAL UPDATES
// ==============================================================================

/// Preconditions checked in the same atomic step as the write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppointmentGuard {
    pub not_cancelled: bool,
    pub unpaid: bool,
}

impl AppointmentGuard {
    pub fn active() -> Self {
        Self { not_cancelled: true, unpaid: false }
    }

    pub fn active_unpaid() -> Self {
        Self { not_cancelled: true, unpaid: true }
    }

    pub fn admits(&self, appointment: &Appointment) -> bool {
        (!self.not_cancelled || !appointment.cancelled) && (!self.unpaid || !appointment.payment)
    }

    fn filters(&self) -> String {
        let mut filters = String::new();
        if self.not_cancelled {
            filters.push_str("&cancelled=eq.false");
        }
        if self.unpaid {
            filters.push_str("&payment=eq.false");
        }
        filters
    }
}

/// Mutable appointment flags. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AppointmentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<PaymentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_intent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_date: Option<DateTime<Utc>>,
}

impl AppointmentPatch {
    pub fn cancel() -> Self {
        Self { cancelled: Some(true), ..Self::default() }
    }

    pub fn complete() -> Self {
        Self { is_completed: Some(true), ..Self::default() }
    }

    pub fn mark_paid(payment_intent_id: &str, paid_at: DateTime<Utc>) -> Self {
        Self {
            payment: Some(true),
            payment_status: Some(PaymentStatus::Completed),
            payment_intent_id: Some(payment_intent_id.to_string()),
            payment_date: Some(paid_at),
            ..Self::default()
        }
    }

    pub fn mark_failed() -> Self {
        Self { payment_status: Some(PaymentStatus::Failed), ..Self::default() }
    }

    pub fn apply(&self, appointment: &mut Appointment) {
        if let Some(cancelled) = self.cancelled {
            appointment.cancelled = cancelled;
        }
        if let Some(is_completed) = self.is_completed {
            appointment.is_completed = is_completed;
        }
        if let Some(payment) = self.payment {
            appointment.payment = payment;
        }
        if let Some(status) = self.payment_status {
            appointment.payment_status = status;
        }
        if let Some(intent) = &self.payment_intent_id {
            appointment.payment_intent_id = Some(intent.clone());
        }
        if let Some(date) = self.payment_date {
            appointment.payment_date = Some(date);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConditionalUpdate {
    /// The guard held and the patch was written; carries the updated record.
    Applied(Appointment),
    /// The guard did not hold; carries the record as it currently is.
    Skipped(Appointment),
    Missing,
}

#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn create_appointment(&self, appointment: &Appointment) -> Result<Appointment>;

    async fn find_appointment(&self, appointment_id: Uuid) -> Result<Option<Appointment>>;

    /// Non-cancelled appointments of a doctor on one `slot_date`.
    async fn active_for_doctor_on(&self, doctor_id: Uuid, slot_date: &str) -> Result<Vec<Appointment>>;

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Appointment>>;

    async fn list_for_doctor(&self, doctor_id: Uuid) -> Result<Vec<Appointment>>;

    async fn list_all(&self) -> Result<Vec<Appointment>>;

    /// Applies `patch` only if `guard` holds, as one atomic step.
    async fn update_if(
        &self,
        appointment_id: Uuid,
        guard: AppointmentGuard,
        patch: &AppointmentPatch,
    ) -> Result<ConditionalUpdate>;
}

// ==============================================================================
// SUPABASE (PostgREST) BACKEND
// ==============================================================================

pub struct SupabaseAppointmentStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseAppointmentStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn create_appointment(&self, appointment: &Appointment) -> Result<Appointment> {
        debug!("Inserting appointment {} for doctor {}", appointment.id, appointment.doc_id);
        self.supabase
            .insert("appointments", serde_json::to_value(appointment)?)
            .await
    }

    async fn find_appointment(&self, appointment_id: Uuid) -> Result<Option<Appointment>> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let mut rows: Vec<Appointment> = self.supabase.select(&path).await?;

        Ok(if rows.is_empty() { None } else { Some(rows.swap_remove(0)) })
    }

    async fn active_for_doctor_on(&self, doctor_id: Uuid, slot_date: &str) -> Result<Vec<Appointment>> {
        let path = format!(
            "/rest/v1/appointments?doc_id=eq.{}&slot_date=eq.{}&cancelled=eq.false",
            doctor_id,
            urlencoding::encode(slot_date)
        );
        self.supabase.select(&path).await
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Appointment>> {
        let path = format!("/rest/v1/appointments?user_id=eq.{}&order=created_at.desc", user_id);
        self.supabase.select(&path).await
    }

    async fn list_for_doctor(&self, doctor_id: Uuid) -> Result<Vec<Appointment>> {
        let path = format!("/rest/v1/appointments?doc_id=eq.{}&order=created_at.desc", doctor_id);
        self.supabase.select(&path).await
    }

    async fn list_all(&self) -> Result<Vec<Appointment>> {
        self.supabase
            .select("/rest/v1/appointments?order=created_at.desc")
            .await
    }

    async fn update_if(
        &self,
        appointment_id: Uuid,
        guard: AppointmentGuard,
        patch: &AppointmentPatch,
    ) -> Result<ConditionalUpdate> {
        let path = format!("/rest/v1/appointments?id=eq.{}{}", appointment_id, guard.filters());
        let mut rows: Vec<Appointment> = self
            .supabase
            .update_where(&path, serde_json::to_value(patch)?)
            .await?;

        if !rows.is_empty() {
            return Ok(ConditionalUpdate::Applied(rows.swap_remove(0)));
        }

        debug!("Guarded update of appointment {} matched nothing", appointment_id);
        Ok(match self.find_appointment(appointment_id).await? {
            Some(current) => ConditionalUpdate::Skipped(current),
            None => ConditionalUpdate::Missing,
        })
    }
}

// ==============================================================================
// IN-MEMORY BACKEND
// ==============================================================================

#[derive(Default)]
pub struct InMemoryAppointmentStore {
    appointments: RwLock<HashMap<Uuid, Appointment>>,
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_appointments(appointments: impl IntoIterator<Item = Appointment>) -> Self {
        Self {
            appointments: RwLock::new(appointments.into_iter().map(|a| (a.id, a)).collect()),
        }
    }

    async fn collect(&self, keep: impl Fn(&Appointment) -> bool) -> Vec<Appointment> {
        let appointments = self.appointments.read().await;
        let mut found: Vec<Appointment> = appointments.values().filter(|a| keep(a)).cloned().collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        found
    }
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn create_appointment(&self, appointment: &Appointment) -> Result<Appointment> {
        self.appointments
            .write()
            .await
            .insert(appointment.id, appointment.clone());
        Ok(appointment.clone())
    }

    async fn find_appointment(&self, appointment_id: Uuid) -> Result<Option<Appointment>> {
        Ok(self.appointments.read().await.get(&appointment_id).cloned())
    }

    async fn active_for_doctor_on(&self, doctor_id: Uuid, slot_date: &str) -> Result<Vec<Appointment>> {
        Ok(self
            .collect(|a| a.doc_id == doctor_id && a.slot_date == slot_date && !a.cancelled)
            .await)
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Appointment>> {
        Ok(self.collect(|a| a.user_id == user_id).await)
    }

    async fn list_for_doctor(&self, doctor_id: Uuid) -> Result<Vec<Appointment>> {
        Ok(self.collect(|a| a.doc_id == doctor_id).await)
    }

    async fn list_all(&self) -> Result<Vec<Appointment>> {
        Ok(self.collect(|_| true).await)
    }

    async fn update_if(
        &self,
        appointment_id: Uuid,
        guard: AppointmentGuard,
        patch: &AppointmentPatch,
    ) -> Result<ConditionalUpdate> {
        let mut appointments = self.appointments.write().await;
        let Some(appointment) = appointments.get_mut(&appointment_id) else {
            return Ok(ConditionalUpdate::Missing);
        };

        if !guard.admits(appointment) {
            return Ok(ConditionalUpdate::Skipped(appointment.clone()));
        }

        patch.apply(appointment);
        Ok(ConditionalUpdate::Applied(appointment.clone()))
    }
}
