use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use tracing::{debug, error, warn};

use shared_config::AppConfig;

use crate::models::PaymentIntent;
use crate::services::processor::{PaymentProcessor, ProcessorError};

/// Stripe REST client. Requests are form-encoded and authenticated with the secret key.
pub struct StripeClient {
    client: Client,
    base_url: String,
    secret_key: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

impl StripeClient {
    pub fn new(config: &AppConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to build HTTP client with timeout ({}), using defaults", e);
                Client::new()
            });

        Self {
            client,
            base_url: config.stripe_api_base_url.trim_end_matches('/').to_string(),
            secret_key: config.stripe_secret_key.clone(),
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<PaymentIntent, ProcessorError> {
        let response = request
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| ProcessorError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<StripeErrorBody>(&body)
                .ok()
                .and_then(|b| b.error.message)
                .unwrap_or(body);
            error!("Stripe API error ({}): {}", status, message);
            return Err(ProcessorError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<PaymentIntent>()
            .await
            .map_err(|e| ProcessorError::Decode(e.to_string()))
    }
}

#[async_trait]
impl PaymentProcessor for StripeClient {
    async fn create_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<PaymentIntent, ProcessorError> {
        debug!("Creating payment intent for {} {}", amount_minor, currency);

        let mut form = vec![
            ("amount".to_string(), amount_minor.to_string()),
            ("currency".to_string(), currency.to_string()),
            ("automatic_payment_methods[enabled]".to_string(), "true".to_string()),
        ];
        form.extend(
            metadata
                .iter()
                .map(|(key, value)| (format!("metadata[{}]", key), value.clone())),
        );

        let url = format!("{}/payment_intents", self.base_url);
        self.send(self.client.post(&url).form(&form)).await
    }

    async fn retrieve_intent(&self, payment_intent_id: &str) -> Result<PaymentIntent, ProcessorError> {
        debug!("Retrieving payment intent {}", payment_intent_id);

        let url = format!(
            "{}/payment_intents/{}",
            self.base_url,
            urlencoding::encode(payment_intent_id)
        );
        self.send(self.client.get(&url)).await
    }
}
