use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use appointment_cell::{Appointment, PaymentStatus};
use shared_models::error::ServiceError;

/// Metadata key linking a processor intent back to its appointment.
pub const APPOINTMENT_ID_KEY: &str = "appointmentId";

// ==============================================================================
// PROCESSOR OBJECTS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl PaymentIntent {
    pub fn appointment_id(&self) -> Option<&str> {
        self.metadata.get(APPOINTMENT_ID_KEY).map(String::as_str)
    }

    pub fn is_succeeded(&self) -> bool {
        self.status == "succeeded"
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEventData {
    pub object: Value,
}

impl WebhookEvent {
    pub fn payment_intent(&self) -> Option<PaymentIntent> {
        serde_json::from_value(self.data.object.clone()).ok()
    }

    /// The appointment named by the intent's metadata, if it is a well-formed id.
    pub fn appointment_id(&self) -> Option<Uuid> {
        self.payment_intent()?
            .appointment_id()
            .and_then(|id| Uuid::parse_str(id).ok())
    }
}

/// Metadata attached to every intent so payments can be traced back without our DB.
pub fn intent_metadata(appointment: &Appointment) -> BTreeMap<String, String> {
    BTreeMap::from([
        (APPOINTMENT_ID_KEY.to_string(), appointment.id.to_string()),
        ("userId".to_string(), appointment.user_id.to_string()),
        ("doctorName".to_string(), appointment.doc_data.name.clone()),
        ("appointmentDate".to_string(), appointment.slot_date.clone()),
        ("appointmentTime".to_string(), appointment.slot_time.clone()),
    ])
}

/// Fees are kept in major units; processors charge in minor units (cents).
pub fn minor_units(amount: f64) -> Result<i64, ServiceError> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(ServiceError::InvalidRequest(format!("Invalid amount: {}", amount)));
    }
    Ok((amount * 100.0).round() as i64)
}

// ==============================================================================
// REQUEST / RESPONSE TYPES
// ==============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateIntentRequest {
    pub appointment_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfirmPaymentRequest {
    pub payment_intent_id: Option<String>,
    pub appointment_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntentCreated {
    pub client_secret: String,
    pub payment_intent_id: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentConfirmation {
    pub payment_status: PaymentStatus,
    /// True when the payment had already been recorded and nothing was written.
    pub already_confirmed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "appointment_id", rename_all = "snake_case")]
pub enum WebhookOutcome {
    MarkedPaid(Uuid),
    MarkedFailed(Uuid),
    AlreadySettled(Uuid),
    Ignored,
}

pub fn parse_appointment_id(raw: Option<String>) -> Result<Uuid, ServiceError> {
    let raw = raw
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ServiceError::InvalidRequest("Missing appointment_id".to_string()))?;

    Uuid::parse_str(&raw).map_err(|_| ServiceError::InvalidRequest("Invalid appointment_id".to_string()))
}
