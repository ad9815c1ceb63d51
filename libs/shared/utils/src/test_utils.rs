use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::{AppConfig, StoreBackend};
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub stripe_api_base_url: String,
    pub stripe_webhook_secret: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_service_key: "test-service-key".to_string(),
            stripe_api_base_url: "http://localhost:12111/v1".to_string(),
            stripe_webhook_secret: "whsec_test_secret".to_string(),
        }
    }
}

impl TestConfig {
    pub fn with_supabase_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_service_key: self.supabase_service_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            stripe_secret_key: "sk_test_123".to_string(),
            stripe_webhook_secret: self.stripe_webhook_secret.clone(),
            stripe_api_base_url: self.stripe_api_base_url.clone(),
            payment_currency: "usd".to_string(),
            store_backend: StoreBackend::Memory,
            memory_seed_path: None,
            request_timeout_secs: 5,
            server_port: 0,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "patient".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    /// A user whose id is fixed, e.g. a doctor account that must match a doctor record.
    pub fn with_id(id: Uuid, email: &str, role: &str) -> Self {
        Self {
            id: id.to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, "doctor")
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, "patient")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn uuid(&self) -> Uuid {
        Uuid::parse_str(&self.id).unwrap_or_default()
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let claims = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "aud": "authenticated",
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
            .expect("HS256 encoding of test claims")
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// PostgREST row fixtures shaped like the `doctors`, `users` and `appointments` tables.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn doctor_row(doctor_id: &str, available: bool, slots_booked: Value, version: i64) -> Value {
        json!({
            "id": doctor_id,
            "name": "Dr. Richard James",
            "email": "richard@example.com",
            "image": null,
            "speciality": "General physician",
            "degree": "MBBS",
            "experience": "4 Years",
            "about": "Focused on preventive care",
            "fees": 50.0,
            "address": { "line1": "17th Cross, Richmond", "line2": "Circle, Ring Road" },
            "available": available,
            "slots_booked": slots_booked,
            "version": version,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn user_row(user_id: &str) -> Value {
        json!({
            "id": user_id,
            "name": "Test Patient",
            "email": "patient@example.com",
            "phone": "0000000000",
            "image": null,
            "address": { "line1": "", "line2": "" },
            "gender": "Not Selected",
            "dob": "Not Selected"
        })
    }

    pub fn appointment_row(
        appointment_id: &str,
        user_id: &str,
        doctor_id: &str,
        slot_date: &str,
        slot_time: &str,
    ) -> Value {
        json!({
            "id": appointment_id,
            "user_id": user_id,
            "doc_id": doctor_id,
            "user_data": Self::user_row(user_id),
            "doc_data": {
                "id": doctor_id,
                "name": "Dr. Richard James",
                "email": "richard@example.com",
                "speciality": "General physician",
                "fees": 50.0,
                "available": true
            },
            "slot_date": slot_date,
            "slot_time": slot_time,
            "amount": 50.0,
            "created_at": "2024-01-01T00:00:00Z",
            "cancelled": false,
            "is_completed": false,
            "payment": false,
            "payment_status": "none",
            "payment_intent_id": null,
            "payment_date": null
        })
    }
}
