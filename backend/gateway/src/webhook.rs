//! # Webhook Signatures
//!
//! The gateway signs each delivery with a header of the form
//! `t=<unix seconds>,v1=<hex hmac>[,v1=<hex hmac>...]`. The HMAC is SHA-256
//! over `"<t>.<raw body>"` keyed with the endpoint's signing secret. Several
//! `v1` entries appear while a secret is being rolled; any one of them may
//! match.
//!
//! The body must be verified byte-for-byte as received, before any JSON
//! parsing.
use std::time::Duration;

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::{error::WebhookError, models::Event};

pub const SIGNATURE_HEADER: &str = "stripe-signature";
pub const DEFAULT_TOLERANCE: Duration = Duration::from_secs(300);

const SCHEME: &str = "v1";

type HmacSha256 = Hmac<Sha256>;

struct SignatureHeader<'a> {
    timestamp: i64,
    signatures: Vec<&'a str>,
}

fn parse_header(header: &str) -> Result<SignatureHeader<'_>, WebhookError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for item in header.split(',') {
        let Some((key, value)) = item.trim().split_once('=') else {
            continue;
        };

        match key {
            "t" => timestamp = value.parse::<i64>().ok(),
            SCHEME => signatures.push(value),
            _ => {}
        }
    }

    match timestamp {
        Some(timestamp) if !signatures.is_empty() => Ok(SignatureHeader {
            timestamp,
            signatures,
        }),
        _ => Err(WebhookError::MalformedHeader),
    }
}

fn keyed(secret: &str, timestamp: i64, payload: &[u8]) -> HmacSha256 {
    // HMAC accepts keys of any length
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("hmac key length is unrestricted"));
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    mac
}

pub fn compute_signature(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    hex::encode(keyed(secret, timestamp, payload).finalize().into_bytes())
}

/// Header value a gateway would send for `payload` at `timestamp`.
pub fn sign_header(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    format!(
        "t={timestamp},{SCHEME}={}",
        compute_signature(secret, timestamp, payload)
    )
}

pub fn verify_signature(
    payload: &[u8],
    header: Option<&str>,
    secret: Option<&str>,
    tolerance: Duration,
    now: i64,
) -> Result<(), WebhookError> {
    let secret = secret.ok_or(WebhookError::MissingSecret)?;
    let header = parse_header(header.ok_or(WebhookError::MissingHeader)?)?;

    let matched = header.signatures.iter().any(|candidate| {
        hex::decode(candidate)
            .map(|bytes| {
                keyed(secret, header.timestamp, payload)
                    .verify_slice(&bytes)
                    .is_ok()
            })
            .unwrap_or(false)
    });

    if !matched {
        return Err(WebhookError::NoMatchingSignature);
    }

    if now.saturating_sub(header.timestamp) > tolerance.as_secs() as i64 {
        return Err(WebhookError::StaleTimestamp);
    }

    Ok(())
}

/// Verifies the delivery and only then decodes it.
pub fn construct_event(
    payload: &[u8],
    header: Option<&str>,
    secret: Option<&str>,
    tolerance: Duration,
) -> Result<Event, WebhookError> {
    let now = chrono::Utc::now().timestamp();
    verify_signature(payload, header, secret, tolerance, now)?;

    Ok(serde_json::from_slice(payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";
    const BODY: &[u8] = br#"{"id":"evt_1","type":"checkout.session.completed","data":{"object":{"id":"cs_1"}}}"#;
    const NOW: i64 = 1_760_000_000;

    fn verify(header: &str, now: i64) -> Result<(), WebhookError> {
        verify_signature(BODY, Some(header), Some(SECRET), DEFAULT_TOLERANCE, now)
    }

    #[test]
    fn test_signed_header_verifies() {
        let header = sign_header(SECRET, NOW, BODY);

        assert!(verify(&header, NOW + 10).is_ok());
    }

    #[test]
    fn test_any_v1_signature_may_match() {
        let good = compute_signature(SECRET, NOW, BODY);
        let header = format!("t={NOW},v1=deadbeef,v0=ignored,v1={good}");

        assert!(verify(&header, NOW).is_ok());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let header = sign_header("whsec_other", NOW, BODY);

        assert!(matches!(
            verify(&header, NOW),
            Err(WebhookError::NoMatchingSignature)
        ));
    }

    #[test]
    fn test_tampered_body_rejected() {
        let header = sign_header(SECRET, NOW, BODY);
        let result = verify_signature(
            b"{\"id\":\"evt_2\"}",
            Some(&header),
            Some(SECRET),
            DEFAULT_TOLERANCE,
            NOW,
        );

        assert!(matches!(result, Err(WebhookError::NoMatchingSignature)));
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let header = sign_header(SECRET, NOW, BODY);

        assert!(matches!(
            verify(&header, NOW + 301),
            Err(WebhookError::StaleTimestamp)
        ));
    }

    #[test]
    fn test_malformed_and_missing_inputs() {
        assert!(matches!(
            verify("garbage", NOW),
            Err(WebhookError::MalformedHeader)
        ));
        assert!(matches!(
            verify("t=abc,v1=00", NOW),
            Err(WebhookError::MalformedHeader)
        ));
        assert!(matches!(
            verify_signature(BODY, None, Some(SECRET), DEFAULT_TOLERANCE, NOW),
            Err(WebhookError::MissingHeader)
        ));
        assert!(matches!(
            verify_signature(BODY, Some("t=1,v1=00"), None, DEFAULT_TOLERANCE, NOW),
            Err(WebhookError::MissingSecret)
        ));
    }

    #[test]
    fn test_construct_event_decodes_after_verification() {
        let now = chrono::Utc::now().timestamp();
        let header = sign_header(SECRET, now, BODY);

        let event = construct_event(BODY, Some(&header), Some(SECRET), DEFAULT_TOLERANCE).unwrap();

        assert_eq!(event.kind, "checkout.session.completed");
        assert_eq!(event.data.object["id"], "cs_1");
    }
}
