use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::ServiceError;

use crate::models::{user_uuid, BookAppointmentRequest, Requester};
use crate::services::{AppointmentLifecycleService, SlotReservationService};
use crate::state::AppointmentState;

fn reservation_service(state: &AppointmentState) -> SlotReservationService {
    SlotReservationService::new(
        state.doctors.clone(),
        state.appointments.clone(),
        state.users.clone(),
    )
}

// ==============================================================================
// BOOKING
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, ServiceError> {
    let user_id = user_uuid(&user)?;
    let appointment = reservation_service(&state).reserve(user_id, request).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment Booked",
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, ServiceError> {
    let requester = Requester::from_user(&user)?;
    let appointment = reservation_service(&state)
        .cancel(appointment_id, &requester)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment Cancelled",
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(state): State<Arc<AppointmentState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, ServiceError> {
    let requester = Requester::from_user(&user)?;
    let lifecycle = AppointmentLifecycleService::new(state.appointments.clone());
    let appointment = lifecycle.complete(appointment_id, &requester).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment Completed",
        "appointment": appointment
    })))
}

// ==============================================================================
// LISTINGS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_my_appointments(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, ServiceError> {
    let user_id = user_uuid(&user)?;
    let lifecycle = AppointmentLifecycleService::new(state.appointments.clone());
    let appointments = lifecycle.list_for_user(user_id).await?;

    Ok(Json(json!({
        "success": true,
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn list_doctor_appointments(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, ServiceError> {
    let requester = Requester::from_user(&user)?;
    let lifecycle = AppointmentLifecycleService::new(state.appointments.clone());
    let appointments = lifecycle.list_for_doctor(&requester).await?;

    Ok(Json(json!({
        "success": true,
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn doctor_dashboard(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, ServiceError> {
    let requester = Requester::from_user(&user)?;
    let lifecycle = AppointmentLifecycleService::new(state.appointments.clone());
    let dashboard = lifecycle.doctor_dashboard(&requester).await?;

    Ok(Json(json!({
        "success": true,
        "dashboard": dashboard
    })))
}

#[axum::debug_handler]
pub async fn list_all_appointments(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, ServiceError> {
    let requester = Requester::from_user(&user)?;
    let lifecycle = AppointmentLifecycleService::new(state.appointments.clone());
    let appointments = lifecycle.list_all(&requester).await?;

    Ok(Json(json!({
        "success": true,
        "appointments": appointments,
        "total": appointments.len()
    })))
}
