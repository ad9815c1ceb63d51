mod common;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header::AUTHORIZATION, Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use tower::ServiceExt;

use payment_cell::router::payment_routes;
use payment_cell::services::signature::sign;
use payment_cell::PaymentState;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

use common::Fixture;

fn create_test_app(fixture: &Fixture, config: &TestConfig) -> Router {
    payment_routes(Arc::new(PaymentState {
        config: config.to_arc(),
        doctors: fixture.doctors.clone(),
        appointments: fixture.appointments.clone(),
        processor: fixture.processor.clone(),
    }))
}

fn patient_token(fixture: &Fixture, config: &TestConfig) -> String {
    let patient = TestUser::with_id(fixture.patient_id(), "ana@example.com", "patient");
    JwtTestUtils::create_test_token(&patient, &config.jwt_secret, None)
}

fn post_json(uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(AUTHORIZATION, format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn read_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_intent_then_confirm() {
    let fixture = Fixture::new();
    let config = TestConfig::default();
    let app = create_test_app(&fixture, &config);
    let token = patient_token(&fixture, &config);

    let response = app
        .clone()
        .oneshot(post_json("/intent", &token, json!({ "appointment_id": fixture.appointment_id() })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let created = read_json(response).await;
    assert_eq!(created["amount"], 50.0);
    let intent_id = created["payment_intent_id"].as_str().unwrap().to_string();

    // The client finishes the payment with the processor.
    fixture.processor.put_intent(&intent_id, 5000, "succeeded", fixture.appointment_id());

    let response = app
        .oneshot(post_json(
            "/confirm",
            &token,
            json!({ "payment_intent_id": intent_id, "appointment_id": fixture.appointment_id() }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let confirmed = read_json(response).await;
    assert_eq!(confirmed["payment_status"], "completed");
    assert_eq!(confirmed["already_confirmed"], false);
}

#[tokio::test]
async fn test_confirm_error_codes() {
    let fixture = Fixture::new();
    let config = TestConfig::default();
    let app = create_test_app(&fixture, &config);
    let token = patient_token(&fixture, &config);
    fixture.processor.put_intent("pi_cheap", 100, "succeeded", fixture.appointment_id());
    fixture.processor.put_intent("pi_pending", 5000, "processing", fixture.appointment_id());

    let response = app
        .clone()
        .oneshot(post_json(
            "/confirm",
            &token,
            json!({ "payment_intent_id": "pi_cheap", "appointment_id": fixture.appointment_id() }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(read_json(response).await["error"], "AMOUNT_MISMATCH");

    let response = app
        .clone()
        .oneshot(post_json(
            "/confirm",
            &token,
            json!({ "payment_intent_id": "pi_pending", "appointment_id": fixture.appointment_id() }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    let body = read_json(response).await;
    assert_eq!(body["error"], "PAYMENT_NOT_COMPLETED");
    assert_eq!(body["payment_status"], "processing");

    let response = app
        .oneshot(post_json("/confirm", &token, json!({ "payment_intent_id": "pi_cheap" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await["error"], "INVALID_REQUEST");
}

#[tokio::test]
async fn test_webhook_is_public_but_signed() {
    let fixture = Fixture::new();
    let config = TestConfig::default();
    let app = create_test_app(&fixture, &config);
    let payload = json!({
        "id": "evt_1",
        "type": "payment_intent.succeeded",
        "data": { "object": {
            "id": "pi_1",
            "amount": 5000,
            "status": "succeeded",
            "metadata": { "appointmentId": fixture.appointment_id().to_string() }
        }}
    })
    .to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhook")
                .body(Body::from(payload.clone()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await["error"], "AUTHENTICATION_FAILURE");

    let signature = sign(payload.as_bytes(), &config.stripe_webhook_secret, Utc::now().timestamp()).unwrap();
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhook")
                .header("Stripe-Signature", signature)
                .body(Body::from(payload))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["received"], true);
    assert_eq!(body["result"]["outcome"], "marked_paid");
}
