//! # Stripe
//!
//! REST client for the three gateway calls the campaign needs. Stripe takes
//! form-encoded bodies with bracketed keys for nested objects and answers with
//! JSON, wrapping failures in an `{"error": {...}}` envelope.
//!
//! Every request is bounded by the client timeout. A timeout surfaces as
//! [`GatewayError::Timeout`] so callers can fail closed.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{
    PaymentGateway,
    error::GatewayError,
    models::{CheckoutRequest, CheckoutSession, ErrorEnvelope, PaymentIntent, PaymentIntentRequest},
};

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

pub struct StripeClient {
    http: Client,
    api_base: String,
    secret_key: Option<String>,
}

impl StripeClient {
    pub fn new(
        api_base: &str,
        secret_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            secret_key,
        })
    }

    fn authorized(&self, builder: RequestBuilder) -> Result<RequestBuilder, GatewayError> {
        let key = self.secret_key.as_deref().ok_or(GatewayError::MissingApiKey)?;

        Ok(builder.bearer_auth(key))
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(String, String)],
    ) -> Result<T, GatewayError> {
        let url = format!("{}{path}", self.api_base);
        debug!("POST {url}");

        let response = self.authorized(self.http.post(&url))?.form(form).send().await?;

        decode(response).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, GatewayError> {
        let url = format!("{}{path}", self.api_base);
        debug!("GET {url}");

        let response = self.authorized(self.http.get(&url))?.send().await?;

        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
    let status = response.status();
    let bytes = response.bytes().await?;

    if !status.is_success() {
        let message = serde_json::from_slice::<ErrorEnvelope>(&bytes)
            .ok()
            .and_then(|envelope| envelope.error.message)
            .unwrap_or_else(|| String::from_utf8_lossy(&bytes).into_owned());

        return Err(GatewayError::Api { status, message });
    }

    Ok(serde_json::from_slice(&bytes)?)
}

fn pair(key: &str, value: impl ToString) -> (String, String) {
    (key.to_string(), value.to_string())
}

pub fn checkout_form(request: &CheckoutRequest) -> Vec<(String, String)> {
    vec![
        pair("payment_method_types[0]", "card"),
        pair("line_items[0][price_data][currency]", &request.currency),
        pair(
            "line_items[0][price_data][product_data][name]",
            &request.product_name,
        ),
        pair("line_items[0][price_data][unit_amount]", request.amount_cents),
        pair("line_items[0][quantity]", 1),
        pair("mode", "payment"),
        pair("success_url", &request.success_url),
        pair("cancel_url", &request.cancel_url),
    ]
}

pub fn payment_intent_form(request: &PaymentIntentRequest) -> Vec<(String, String)> {
    let mut form = vec![
        pair("amount", request.amount_cents),
        pair("currency", &request.currency),
        pair("automatic_payment_methods[enabled]", true),
    ];

    let mut metadata: Vec<_> = request.metadata.iter().collect();
    metadata.sort();
    form.extend(
        metadata
            .into_iter()
            .map(|(key, value)| pair(&format!("metadata[{key}]"), value)),
    );

    form
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        self.post_form("/v1/checkout/sessions", &checkout_form(&request))
            .await
    }

    async fn create_payment_intent(
        &self,
        request: PaymentIntentRequest,
    ) -> Result<PaymentIntent, GatewayError> {
        self.post_form("/v1/payment_intents", &payment_intent_form(&request))
            .await
    }

    async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent, GatewayError> {
        self.get(&format!("/v1/payment_intents/{id}")).await
    }
}
