//! Webhook signatures in the Stripe scheme: the `Stripe-Signature` header carries
//! `t=<unix seconds>,v1=<hex hmac-sha256 of "<t>.<payload>">`, possibly with several
//! `v1` entries while a secret is being rolled.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Maximum age (and future skew) of a signed timestamp.
pub const TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("webhook secret is not configured")]
    MissingSecret,

    #[error("signature header is missing")]
    MissingHeader,

    #[error("signature header is malformed")]
    Malformed,

    #[error("signature timestamp is outside the tolerance window")]
    Expired,

    #[error("no signature matches the payload")]
    Mismatch,

    #[error("invalid event payload: {0}")]
    Payload(String),
}

fn signed_mac(payload: &[u8], secret: &str, timestamp: i64) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Some(mac)
}

/// Builds a header value for `payload`, as the processor would send it.
pub fn sign(payload: &[u8], secret: &str, timestamp: i64) -> Option<String> {
    let mac = signed_mac(payload, secret, timestamp)?;
    Some(format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes())))
}

pub fn verify(payload: &[u8], header: &str, secret: &str, now: i64) -> Result<(), SignatureError> {
    if secret.is_empty() {
        return Err(SignatureError::MissingSecret);
    }

    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = value.parse::<i64>().ok(),
            "v1" => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::Malformed)?;
    if signatures.is_empty() {
        return Err(SignatureError::Malformed);
    }
    if (now - timestamp).abs() > TOLERANCE_SECS {
        return Err(SignatureError::Expired);
    }

    let matched = signatures.iter().any(|signature| {
        let Ok(expected) = hex::decode(signature) else {
            return false;
        };
        let Some(mac) = signed_mac(payload, secret, timestamp) else {
            return false;
        };
        // verify_slice compares in constant time
        mac.verify_slice(&expected).is_ok()
    });

    if matched {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}
