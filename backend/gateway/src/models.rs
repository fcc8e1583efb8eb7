use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

/// Signed notification delivered to the webhook endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub amount_total: Option<u64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
}

impl CheckoutSession {
    pub fn is_paid(&self) -> bool {
        self.payment_status.as_deref() == Some("paid")
    }

    pub fn is_in_currency(&self, currency: &str) -> bool {
        self.currency
            .as_deref()
            .is_some_and(|own| own.eq_ignore_ascii_case(currency))
    }

    /// Key shared with the client confirmation path, which only ever sees the
    /// payment intent.
    pub fn payment_key(&self) -> &str {
        self.payment_intent.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentIntentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    RequiresCapture,
    Canceled,
    Succeeded,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaymentIntent {
    pub id: String,
    pub status: PaymentIntentStatus,
    pub amount: u64,
    #[serde(default)]
    pub amount_received: u64,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub client_secret: Option<String>,
}

impl PaymentIntent {
    pub fn succeeded(&self) -> bool {
        self.status == PaymentIntentStatus::Succeeded
    }
}

/// Hosted checkout page for a single donation line item.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub amount_cents: u64,
    pub currency: String,
    pub product_name: String,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone)]
pub struct PaymentIntentRequest {
    pub amount_cents: u64,
    pub currency: String,
    pub metadata: HashMap<String, String>,
}

#[derive(Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}
