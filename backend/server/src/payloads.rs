//! # Payloads
//!
//! Request and response bodies for the JSON API. Bodies are taken as raw bytes
//! and decoded here so shape errors come back as 400 with serde's message.
//! Amounts arrive as JSON numbers and are checked before any gateway call.
use axum::body::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    campaign::{CampaignState, Cents},
    error::AppError,
};

pub const MIN_CHECKOUT: Cents = Cents::from_dollars(1);
pub const MIN_PAYMENT_INTENT: Cents = Cents::new(50);

const MAX_PAYMENT_ID_LEN: usize = 255;

pub fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, AppError> {
    serde_json::from_slice(body).map_err(|e| AppError::MalformedPayload(e.to_string()))
}

fn to_cents(value: f64, scale: f64) -> Option<Cents> {
    let cents = (value * scale).round();

    (value.is_finite() && cents >= 0.0 && cents <= u64::MAX as f64).then(|| Cents::new(cents as u64))
}

#[derive(Deserialize)]
pub struct CheckoutPayload {
    /// Dollars.
    pub amount: f64,
}

impl CheckoutPayload {
    /// The minimum applies to the amount as sent, before rounding to cents.
    pub fn validated_amount(&self) -> Result<Cents, AppError> {
        if self.amount < MIN_CHECKOUT.as_dollars() {
            return Err(AppError::InvalidAmount("$1."));
        }

        to_cents(self.amount, 100.0).ok_or(AppError::InvalidAmount("$1."))
    }
}

#[derive(Deserialize)]
pub struct PaymentIntentPayload {
    /// Cents.
    pub amount: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "usd".to_string()
}

impl PaymentIntentPayload {
    pub fn validated_amount(&self) -> Result<Cents, AppError> {
        if self.amount < MIN_PAYMENT_INTENT.get() as f64 {
            return Err(AppError::InvalidAmount("$0.50"));
        }

        if self.amount.fract() != 0.0 {
            return Err(AppError::MalformedPayload(
                "amount must be a whole number of cents".to_string(),
            ));
        }

        to_cents(self.amount, 1.0).ok_or(AppError::InvalidAmount("$0.50"))
    }

    pub fn validated_currency(&self) -> Result<String, AppError> {
        let currency = self.currency.trim();

        if currency.len() == 3 && currency.bytes().all(|b| b.is_ascii_alphabetic()) {
            Ok(currency.to_ascii_lowercase())
        } else {
            Err(AppError::InvalidCurrency)
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSuccessPayload {
    pub payment_intent_id: String,
    /// Client-claimed cents; informational only.
    #[serde(default)]
    pub amount: Option<f64>,
}

impl PaymentSuccessPayload {
    /// Intent ids are interpolated into the gateway URL, so only
    /// `[A-Za-z0-9_]` is accepted.
    pub fn validated_id(&self) -> Result<&str, AppError> {
        let id = self.payment_intent_id.as_str();

        if !id.is_empty()
            && id.len() <= MAX_PAYMENT_ID_LEN
            && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
        {
            Ok(id)
        } else {
            Err(AppError::MalformedPayload(
                "paymentIntentId is not a valid identifier".to_string(),
            ))
        }
    }

    pub fn claimed_amount(&self) -> Option<Cents> {
        self.amount.and_then(|amount| to_cents(amount, 1.0))
    }
}

#[derive(Serialize)]
pub struct CheckoutResponse {
    pub url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentResponse {
    pub client_secret: Option<String>,
    pub amount: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSuccessResponse {
    pub success: bool,
    pub message: &'static str,
    pub recorded: bool,
    pub campaign_data: CampaignState,
}

#[derive(Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishableKey {
    pub publishable_key: Option<String>,
}

#[derive(Serialize)]
pub struct Health {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub campaign: CampaignState,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkout(body: &str) -> Result<Cents, AppError> {
        parse_body::<CheckoutPayload>(&Bytes::from(body.to_string()))?.validated_amount()
    }

    fn intent(body: &str) -> Result<PaymentIntentPayload, AppError> {
        parse_body(&Bytes::from(body.to_string()))
    }

    #[test]
    fn test_checkout_amounts() {
        assert_eq!(checkout(r#"{"amount":25}"#).unwrap(), Cents::from_dollars(25));
        assert_eq!(checkout(r#"{"amount":1}"#).unwrap(), Cents::from_dollars(1));
        assert_eq!(checkout(r#"{"amount":10.5}"#).unwrap(), Cents::new(1050));
        assert!(matches!(checkout(r#"{"amount":0}"#), Err(AppError::InvalidAmount(_))));
        assert!(matches!(checkout(r#"{"amount":0.99}"#), Err(AppError::InvalidAmount(_))));
        assert!(matches!(checkout(r#"{"amount":0.999}"#), Err(AppError::InvalidAmount(_))));
        assert!(matches!(checkout(r#"{"amount":0.9999999}"#), Err(AppError::InvalidAmount(_))));
        assert_eq!(checkout(r#"{"amount":1.004}"#).unwrap(), Cents::from_dollars(1));
        assert!(matches!(checkout(r#"{"amount":-5}"#), Err(AppError::InvalidAmount(_))));
    }

    #[test]
    fn test_missing_or_mistyped_fields() {
        assert!(matches!(checkout("{}"), Err(AppError::MalformedPayload(_))));
        assert!(matches!(checkout(r#"{"amount":"ten"}"#), Err(AppError::MalformedPayload(_))));
        assert!(matches!(checkout("not json"), Err(AppError::MalformedPayload(_))));
    }

    #[test]
    fn test_payment_intent_minimum_and_currency() {
        let payload = intent(r#"{"amount":50}"#).unwrap();
        assert_eq!(payload.validated_amount().unwrap(), Cents::new(50));
        assert_eq!(payload.validated_currency().unwrap(), "usd");

        let payload = intent(r#"{"amount":49.4,"currency":"EUR"}"#).unwrap();
        assert!(matches!(payload.validated_amount(), Err(AppError::InvalidAmount(_))));
        assert_eq!(payload.validated_currency().unwrap(), "eur");

        let payload = intent(r#"{"amount":49.5}"#).unwrap();
        assert!(matches!(payload.validated_amount(), Err(AppError::InvalidAmount(_))));

        let payload = intent(r#"{"amount":49.99}"#).unwrap();
        assert!(matches!(payload.validated_amount(), Err(AppError::InvalidAmount(_))));

        let payload = intent(r#"{"amount":50.5}"#).unwrap();
        assert!(matches!(payload.validated_amount(), Err(AppError::MalformedPayload(_))));

        let payload = intent(r#"{"amount":100,"currency":"dollars"}"#).unwrap();
        assert!(matches!(payload.validated_currency(), Err(AppError::InvalidCurrency)));
    }

    #[test]
    fn test_payment_intent_id_shape() {
        let parse = |body: &str| -> PaymentSuccessPayload {
            parse_body(&Bytes::from(body.to_string())).unwrap()
        };

        let payload = parse(r#"{"paymentIntentId":"pi_3Abc123","amount":2500}"#);
        assert_eq!(payload.validated_id().unwrap(), "pi_3Abc123");
        assert_eq!(payload.claimed_amount(), Some(Cents::new(2500)));

        for bad in ["", "pi_1/../../v1/charges", "pi 1", "pi_1?expand=x"] {
            let payload = parse(&format!(r#"{{"paymentIntentId":"{bad}"}}"#));
            assert!(payload.validated_id().is_err(), "{bad} accepted");
        }
    }
}
