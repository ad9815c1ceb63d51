use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::ServiceError;

use crate::models::{AvailableSlotsQuery, ChangeAvailabilityRequest};
use crate::services::DoctorService;
use crate::state::DoctorState;

// ==============================================================================
// PUBLIC HANDLERS (NO AUTHENTICATION REQUIRED)
// ==============================================================================

#[axum::debug_handler]
pub async fn list_doctors(
    State(state): State<Arc<DoctorState>>,
) -> Result<Json<Value>, ServiceError> {
    let doctor_service = DoctorService::new(state.doctors.clone());
    let doctors = doctor_service.list_doctors().await?;

    Ok(Json(json!({
        "success": true,
        "doctors": doctors,
        "total": doctors.len()
    })))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(state): State<Arc<DoctorState>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, ServiceError> {
    let doctor_service = DoctorService::new(state.doctors.clone());
    let doctor = doctor_service.get_doctor(doctor_id).await?;

    Ok(Json(json!({
        "success": true,
        "doctor": doctor
    })))
}

#[axum::debug_handler]
pub async fn get_available_slots(
    State(state): State<Arc<DoctorState>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<AvailableSlotsQuery>,
) -> Result<Json<Value>, ServiceError> {
    let doctor_service = DoctorService::new(state.doctors.clone());
    let days = doctor_service
        .available_slots(doctor_id, query.days, Utc::now().naive_utc())
        .await?;

    Ok(Json(json!({
        "success": true,
        "doctor_id": doctor_id,
        "days": days
    })))
}

// ==============================================================================
// PROTECTED HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn change_availability(
    State(state): State<Arc<DoctorState>>,
    Path(doctor_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(request): Json<ChangeAvailabilityRequest>,
) -> Result<Json<Value>, ServiceError> {
    let doctor_service = DoctorService::new(state.doctors.clone());
    let doctor = doctor_service
        .change_availability(doctor_id, &user, request.available)
        .await?;

    Ok(Json(json!({
        "success": true,
        "doctor": doctor,
        "message": "Availability changed"
    })))
}
