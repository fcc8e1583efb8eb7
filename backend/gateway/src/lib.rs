//! # Payment Gateway
//!
//! Everything the campaign server knows about the card processor lives here:
//! the calls it makes, the shapes it receives, and how webhook deliveries are
//! authenticated.
//!
//! The server only depends on [`PaymentGateway`], so tests and alternative
//! processors can stand in for [`stripe::StripeClient`].
use async_trait::async_trait;

pub mod error;
pub mod models;
pub mod stripe;
pub mod webhook;

pub use error::{GatewayError, WebhookError};
pub use models::{
    CheckoutRequest, CheckoutSession, Event, PaymentIntent, PaymentIntentRequest,
    PaymentIntentStatus,
};

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, GatewayError>;

    async fn create_payment_intent(
        &self,
        request: PaymentIntentRequest,
    ) -> Result<PaymentIntent, GatewayError>;

    async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent, GatewayError>;
}
