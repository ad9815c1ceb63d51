use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Extension, State},
    http::HeaderMap,
    Json,
};
use serde_json::{json, Value};

use appointment_cell::user_uuid;
use shared_models::auth::User;
use shared_models::error::ServiceError;

use crate::models::{parse_appointment_id, ConfirmPaymentRequest, CreateIntentRequest};
use crate::state::PaymentState;

const SIGNATURE_HEADER: &str = "stripe-signature";

#[axum::debug_handler]
pub async fn create_payment_intent(
    State(state): State<Arc<PaymentState>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateIntentRequest>,
) -> Result<Json<Value>, ServiceError> {
    let user_id = user_uuid(&user)?;
    let appointment_id = parse_appointment_id(request.appointment_id)?;

    let intent = state
        .reconciliation()
        .create_intent(appointment_id, user_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "client_secret": intent.client_secret,
        "payment_intent_id": intent.payment_intent_id,
        "amount": intent.amount
    })))
}

#[axum::debug_handler]
pub async fn confirm_payment(
    State(state): State<Arc<PaymentState>>,
    Extension(user): Extension<User>,
    Json(request): Json<ConfirmPaymentRequest>,
) -> Result<Json<Value>, ServiceError> {
    let user_id = user_uuid(&user)?;
    let appointment_id = parse_appointment_id(request.appointment_id)?;
    let payment_intent_id = request.payment_intent_id.unwrap_or_default();

    let confirmation = state
        .reconciliation()
        .confirm_payment(&payment_intent_id, appointment_id, user_id)
        .await?;

    let message = if confirmation.already_confirmed {
        "Payment already confirmed"
    } else {
        "Payment completed successfully"
    };

    Ok(Json(json!({
        "success": true,
        "message": message,
        "payment_status": confirmation.payment_status,
        "already_confirmed": confirmation.already_confirmed
    })))
}

/// Processor notifications. The raw body is needed to check the signature.
#[axum::debug_handler]
pub async fn payment_webhook(
    State(state): State<Arc<PaymentState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ServiceError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let outcome = state
        .reconciliation()
        .handle_webhook(&body, signature, state.config.webhook_secret())
        .await?;

    Ok(Json(json!({
        "success": true,
        "received": true,
        "result": outcome
    })))
}
