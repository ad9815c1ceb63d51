use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use appointment_cell::{
    Appointment, AppointmentGuard, AppointmentPatch, AppointmentStore, ConditionalUpdate, PaymentStatus,
};
use doctor_cell::DoctorStore;
use shared_models::error::ServiceError;

use crate::models::{
    intent_metadata, minor_units, IntentCreated, PaymentConfirmation, WebhookEvent, WebhookOutcome,
};
use crate::services::processor::PaymentProcessor;
use crate::services::signature::SignatureError;

const EVENT_SUCCEEDED: &str = "payment_intent.succeeded";
const EVENT_FAILED: &str = "payment_intent.payment_failed";

/// Keeps appointment payment flags in line with the processor. The synchronous
/// confirmation and the webhook write through the same guarded update, so whichever
/// arrives second is a no-op.
pub struct PaymentReconciliationService {
    doctors: Arc<dyn DoctorStore>,
    appointments: Arc<dyn AppointmentStore>,
    processor: Arc<dyn PaymentProcessor>,
    currency: String,
}

impl PaymentReconciliationService {
    pub fn new(
        doctors: Arc<dyn DoctorStore>,
        appointments: Arc<dyn AppointmentStore>,
        processor: Arc<dyn PaymentProcessor>,
        currency: &str,
    ) -> Self {
        Self {
            doctors,
            appointments,
            processor,
            currency: currency.to_string(),
        }
    }

    pub async fn create_intent(
        &self,
        appointment_id: Uuid,
        user_id: Uuid,
    ) -> Result<IntentCreated, ServiceError> {
        let appointment = self.owned_appointment(appointment_id, user_id).await?;

        if appointment.cancelled {
            return Err(ServiceError::Cancelled);
        }
        if appointment.payment {
            return Err(ServiceError::AlreadyPaid);
        }
        self.ensure_doctor_available(&appointment).await?;

        let amount = minor_units(appointment.amount)?;
        let intent = self
            .processor
            .create_intent(amount, &self.currency, &intent_metadata(&appointment))
            .await
            .map_err(ServiceError::processor)?;

        let client_secret = intent
            .client_secret
            .ok_or_else(|| ServiceError::processor("payment intent has no client secret"))?;

        info!("Created payment intent {} for appointment {}", intent.id, appointment_id);
        Ok(IntentCreated {
            client_secret,
            payment_intent_id: intent.id,
            amount: appointment.amount,
        })
    }

    pub async fn confirm_payment(
        &self,
        payment_intent_id: &str,
        appointment_id: Uuid,
        user_id: Uuid,
    ) -> Result<PaymentConfirmation, ServiceError> {
        let payment_intent_id = payment_intent_id.trim();
        if payment_intent_id.is_empty() {
            return Err(ServiceError::InvalidRequest("Missing payment_intent_id".to_string()));
        }

        let appointment = self.owned_appointment(appointment_id, user_id).await?;

        if appointment.cancelled {
            return Err(ServiceError::Cancelled);
        }
        if appointment.payment {
            return settled_with(&appointment, payment_intent_id);
        }
        self.ensure_doctor_available(&appointment).await?;

        let intent = self
            .processor
            .retrieve_intent(payment_intent_id)
            .await
            .map_err(ServiceError::processor)?;

        let expected_appointment = appointment_id.to_string();
        if intent.appointment_id() != Some(expected_appointment.as_str()) {
            warn!(
                "Payment intent {} is not linked to appointment {}",
                payment_intent_id, appointment_id
            );
            return Err(ServiceError::InvalidRequest(
                "Payment intent does not belong to this appointment".to_string(),
            ));
        }

        let expected = minor_units(appointment.amount)?;
        if intent.amount != expected {
            warn!(
                "Amount mismatch on appointment {}: expected {}, charged {}",
                appointment_id, expected, intent.amount
            );
            return Err(ServiceError::AmountMismatch {
                expected,
                charged: intent.amount,
            });
        }

        if !intent.is_succeeded() {
            return Err(ServiceError::PaymentNotCompleted { status: intent.status });
        }

        match self.mark_paid(appointment_id, payment_intent_id).await? {
            ConditionalUpdate::Applied(_) => {
                info!("Payment {} recorded for appointment {}", payment_intent_id, appointment_id);
                Ok(PaymentConfirmation {
                    payment_status: PaymentStatus::Completed,
                    already_confirmed: false,
                })
            }
            // Lost the race, most likely to the webhook.
            ConditionalUpdate::Skipped(current) if current.cancelled => Err(ServiceError::Cancelled),
            ConditionalUpdate::Skipped(current) => settled_with(&current, payment_intent_id),
            ConditionalUpdate::Missing => Err(ServiceError::NotFound("Appointment".to_string())),
        }
    }

    /// Applies a verified processor event. Unknown events and events without an
    /// appointment reference are acknowledged and ignored.
    pub async fn apply_event(&self, event: &WebhookEvent) -> Result<WebhookOutcome, ServiceError> {
        debug!("Webhook event {} ({})", event.id, event.event_type);

        let patch = match event.event_type.as_str() {
            EVENT_SUCCEEDED => match event.payment_intent() {
                Some(intent) => AppointmentPatch::mark_paid(&intent.id, Utc::now()),
                None => return Ok(WebhookOutcome::Ignored),
            },
            EVENT_FAILED => AppointmentPatch::mark_failed(),
            _ => return Ok(WebhookOutcome::Ignored),
        };

        let Some(appointment_id) = event.appointment_id() else {
            debug!("Webhook event {} names no appointment", event.id);
            return Ok(WebhookOutcome::Ignored);
        };

        let outcome = self
            .appointments
            .update_if(appointment_id, AppointmentGuard::active_unpaid(), &patch)
            .await
            .map_err(ServiceError::store)?;

        Ok(match outcome {
            ConditionalUpdate::Applied(_) if event.event_type == EVENT_SUCCEEDED => {
                info!("Webhook marked appointment {} as paid", appointment_id);
                WebhookOutcome::MarkedPaid(appointment_id)
            }
            ConditionalUpdate::Applied(_) => {
                info!("Webhook marked payment of appointment {} as failed", appointment_id);
                WebhookOutcome::MarkedFailed(appointment_id)
            }
            ConditionalUpdate::Skipped(_) => WebhookOutcome::AlreadySettled(appointment_id),
            ConditionalUpdate::Missing => {
                warn!("Webhook event {} references unknown appointment {}", event.id, appointment_id);
                WebhookOutcome::Ignored
            }
        })
    }

    /// Verifies and applies a raw webhook delivery.
    pub async fn handle_webhook(
        &self,
        payload: &[u8],
        signature_header: Option<&str>,
        secret: Option<&str>,
    ) -> Result<WebhookOutcome, ServiceError> {
        let verified = match (secret, signature_header) {
            (None, _) => Err(SignatureError::MissingSecret),
            (_, None) => Err(SignatureError::MissingHeader),
            (Some(secret), Some(header)) => self.processor.verify_webhook(payload, header, secret),
        };

        let event = verified.map_err(|e| {
            warn!("Webhook rejected: {}", e);
            ServiceError::AuthenticationFailure(e.to_string())
        })?;

        self.apply_event(&event).await
    }

    async fn owned_appointment(&self, appointment_id: Uuid, user_id: Uuid) -> Result<Appointment, ServiceError> {
        let appointment = self
            .appointments
            .find_appointment(appointment_id)
            .await
            .map_err(ServiceError::store)?
            .ok_or_else(|| ServiceError::NotFound("Appointment".to_string()))?;

        if appointment.user_id != user_id {
            warn!("User {} attempted to pay for appointment {}", user_id, appointment_id);
            return Err(ServiceError::Unauthorized("Not authorized to pay for this appointment".to_string()));
        }
        Ok(appointment)
    }

    async fn ensure_doctor_available(&self, appointment: &Appointment) -> Result<(), ServiceError> {
        let doctor = self
            .doctors
            .find_doctor(appointment.doc_id)
            .await
            .map_err(ServiceError::store)?;

        match doctor {
            Some(doctor) if doctor.is_available() => Ok(()),
            _ => Err(ServiceError::DoctorUnavailable),
        }
    }

    async fn mark_paid(&self, appointment_id: Uuid, payment_intent_id: &str) -> Result<ConditionalUpdate, ServiceError> {
        self.appointments
            .update_if(
                appointment_id,
                AppointmentGuard::active_unpaid(),
                &AppointmentPatch::mark_paid(payment_intent_id, Utc::now()),
            )
            .await
            .map_err(ServiceError::store)
    }
}

/// The appointment is already paid: fine if it was this intent, a conflict otherwise.
fn settled_with(appointment: &Appointment, payment_intent_id: &str) -> Result<PaymentConfirmation, ServiceError> {
    if appointment.payment_intent_id.as_deref() == Some(payment_intent_id) {
        debug!("Payment {} already recorded for appointment {}", payment_intent_id, appointment.id);
        Ok(PaymentConfirmation {
            payment_status: PaymentStatus::Completed,
            already_confirmed: true,
        })
    } else {
        Err(ServiceError::AlreadyPaid)
    }
}
