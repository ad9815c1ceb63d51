use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failures raised by the bearer-token layer before a handler runs.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Auth(msg) => (StatusCode::UNAUTHORIZED, msg),
        };

        tracing::error!("Error: {}: {}", status, message);

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

/// Outcome taxonomy of the reservation and payment protocols. The `code()` of each
/// variant is part of the HTTP contract so clients can tell "pick another time" apart
/// from "pick another doctor".
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Doctor is not available")]
    DoctorUnavailable,

    #[error("Slot already booked")]
    SlotTaken,

    #[error("Payment already completed")]
    AlreadyPaid,

    #[error("Appointment is cancelled")]
    Cancelled,

    #[error("Payment amount mismatch: expected {expected}, charged {charged}")]
    AmountMismatch { expected: i64, charged: i64 },

    #[error("Payment not completed")]
    PaymentNotCompleted { status: String },

    #[error("Webhook authentication failed: {0}")]
    AuthenticationFailure(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Payment processor error: {0}")]
    Processor(String),
}

impl ServiceError {
    pub fn store(err: impl std::fmt::Display) -> Self {
        ServiceError::Store(err.to_string())
    }

    pub fn processor(err: impl std::fmt::Display) -> Self {
        ServiceError::Processor(err.to_string())
    }

    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::InvalidRequest(_) => "INVALID_REQUEST",
            ServiceError::NotFound(_) => "NOT_FOUND",
            ServiceError::Unauthorized(_) => "UNAUTHORIZED",
            ServiceError::DoctorUnavailable => "DOCTOR_UNAVAILABLE",
            ServiceError::SlotTaken => "SLOT_TAKEN",
            ServiceError::AlreadyPaid => "ALREADY_PAID",
            ServiceError::Cancelled => "APPOINTMENT_CANCELLED",
            ServiceError::AmountMismatch { .. } => "AMOUNT_MISMATCH",
            ServiceError::PaymentNotCompleted { .. } => "PAYMENT_NOT_COMPLETED",
            ServiceError::AuthenticationFailure(_) => "AUTHENTICATION_FAILURE",
            ServiceError::Store(_) => "INTERNAL_ERROR",
            ServiceError::Processor(_) => "PAYMENT_PROCESSOR_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Unauthorized(_) => StatusCode::FORBIDDEN,
            ServiceError::DoctorUnavailable
            | ServiceError::SlotTaken
            | ServiceError::AlreadyPaid
            | ServiceError::Cancelled => StatusCode::CONFLICT,
            ServiceError::AmountMismatch { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::PaymentNotCompleted { .. } => StatusCode::PAYMENT_REQUIRED,
            ServiceError::AuthenticationFailure(_) => StatusCode::BAD_REQUEST,
            ServiceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::Processor(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Text safe to show to the caller. Internal faults are replaced by a generic line.
    pub fn public_message(&self) -> String {
        match self {
            ServiceError::Store(_) => "Something went wrong, please try again".to_string(),
            ServiceError::Processor(_) => "Payment processor is unavailable, please try again".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self {
            ServiceError::Store(detail) | ServiceError::Processor(detail) => {
                tracing::error!(code = self.code(), "Internal failure: {}", detail);
            }
            _ => tracing::warn!(code = self.code(), "Request rejected: {}", self),
        }

        let mut body = json!({
            "success": false,
            "error": self.code(),
            "message": self.public_message(),
        });

        if let ServiceError::PaymentNotCompleted { status } = &self {
            body["payment_status"] = json!(status);
        }

        (status, Json(body)).into_response()
    }
}
