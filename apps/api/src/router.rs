use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::{router::appointment_routes, AppointmentState};
use doctor_cell::{router::doctor_routes, DoctorState};
use payment_cell::{router::payment_routes, PaymentState, StripeClient};
use shared_config::AppConfig;

use crate::stores::Stores;

pub fn create_router(config: Arc<AppConfig>, stores: Stores) -> Router {
    let processor = Arc::new(StripeClient::new(&config));

    let doctor_state = Arc::new(DoctorState {
        config: config.clone(),
        doctors: stores.doctors.clone(),
    });

    let appointment_state = Arc::new(AppointmentState {
        config: config.clone(),
        doctors: stores.doctors.clone(),
        appointments: stores.appointments.clone(),
        users: stores.users.clone(),
    });

    let payment_state = Arc::new(PaymentState {
        config,
        doctors: stores.doctors,
        appointments: stores.appointments,
        processor,
    });

    Router::new()
        .route("/", get(|| async { "DocBook API is running!" }))
        .nest("/doctors", doctor_routes(doctor_state))
        .nest("/appointments", appointment_routes(appointment_state))
        .nest("/payments", payment_routes(payment_state))
}
