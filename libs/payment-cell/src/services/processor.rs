use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;

use crate::models::{PaymentIntent, WebhookEvent};
use crate::services::signature::{self, SignatureError};

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("payment processor unreachable: {0}")]
    Transport(String),

    #[error("payment processor rejected the request ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("unexpected payment processor response: {0}")]
    Decode(String),
}

/// External payment processor.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn create_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<PaymentIntent, ProcessorError>;

    async fn retrieve_intent(&self, payment_intent_id: &str) -> Result<PaymentIntent, ProcessorError>;

    /// Authenticates a webhook delivery and parses the event it carries.
    fn verify_webhook(
        &self,
        payload: &[u8],
        signature_header: &str,
        secret: &str,
    ) -> Result<WebhookEvent, SignatureError> {
        signature::verify(payload, signature_header, secret, Utc::now().timestamp())?;
        serde_json::from_slice(payload).map_err(|e| SignatureError::Payload(e.to_string()))
    }
}
