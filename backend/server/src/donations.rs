//! # Donation Confirmation
//!
//! Two triggers feed the campaign total:
//!
//! - **Webhook**: a signed `checkout.session.completed` delivery. This is the
//!   source of truth; the signature is checked against the raw body before
//!   anything is parsed.
//! - **Client confirmation**: the browser reports a payment intent id. The
//!   intent is re-fetched from the gateway and only its settled
//!   `amount_received` counts; the client's claimed amount is ignored.
//!
//! Both converge on [`CampaignStore::record`] keyed by the payment intent id,
//! so whichever arrives second is a no-op. Any failure before `record` leaves
//! the campaign untouched.
use std::{future::Future, time::Duration};

use axum::{body::Bytes, http::HeaderMap};
use chrono::Utc;
use gateway::{
    CheckoutSession, GatewayError, WebhookError,
    models::CHECKOUT_SESSION_COMPLETED,
    webhook::{SIGNATURE_HEADER, construct_event},
};
use tracing::{info, warn};

use crate::{
    campaign::{CAMPAIGN_CURRENCY, Cents},
    error::AppError,
    milestones::Milestone,
    payloads::PaymentSuccessPayload,
    state::AppState,
    store::{ConfirmedDonation, RecordOutcome},
};

pub const CONFIRMATION_FAILED: &str = "Unable to process payment confirmation";

/// Caps a gateway call; running out of time counts as a gateway failure.
pub async fn bounded<T>(
    timeout: Duration,
    call: impl Future<Output = Result<T, GatewayError>>,
) -> Result<T, GatewayError> {
    tokio::time::timeout(timeout, call)
        .await
        .unwrap_or(Err(GatewayError::Timeout))
}

async fn record(state: &AppState, donation: ConfirmedDonation) -> Result<RecordOutcome, AppError> {
    let payment_id = donation.payment_id.clone();
    let amount = donation.amount;

    let outcome = state.store.record(donation).await?;

    match &outcome {
        RecordOutcome::Applied { state: campaign, milestones } => {
            for milestone in milestones {
                announce(*milestone, campaign.goal());
            }

            info!(
                payment_id = %payment_id,
                "New donation: {amount} - Total: {} ({:.1}%)",
                campaign.current_amount(),
                campaign.percentage()
            );
        }
        RecordOutcome::Duplicate { .. } => {
            info!(payment_id = %payment_id, "Payment already recorded, skipping");
        }
    }

    Ok(outcome)
}

fn announce(milestone: Milestone, goal: Cents) {
    match milestone {
        Milestone::Hundred => info!(
            milestone = milestone.label(),
            "GOAL ACHIEVED: 100% of {goal} goal reached!"
        ),
        _ => info!(
            milestone = milestone.label(),
            "Milestone reached: {} of goal!",
            milestone.label()
        ),
    }
}

pub async fn confirm_payment_intent(
    state: &AppState,
    payload: &PaymentSuccessPayload,
) -> Result<RecordOutcome, AppError> {
    let id = payload.validated_id()?;

    let intent = bounded(
        state.config.gateway_timeout,
        state.gateway.retrieve_payment_intent(id),
    )
    .await
    .map_err(AppError::gateway(CONFIRMATION_FAILED))?;

    if !intent.succeeded() {
        info!(payment_id = id, status = ?intent.status, "Payment not completed");
        return Err(AppError::PaymentNotCompleted);
    }

    if !intent.currency.eq_ignore_ascii_case(CAMPAIGN_CURRENCY) {
        warn!(
            payment_id = id,
            currency = %intent.currency,
            "Payment settled in a currency the campaign does not count"
        );
        return Err(AppError::InvalidCurrency);
    }

    let settled = Cents::new(intent.amount_received);
    if let Some(claimed) = payload.claimed_amount() {
        if claimed != settled {
            warn!(
                payment_id = id,
                "Client claimed {claimed} but gateway settled {settled}, using gateway amount"
            );
        }
    }

    record(
        state,
        ConfirmedDonation {
            payment_id: intent.id,
            amount: settled,
            confirmed_at: Utc::now(),
        },
    )
    .await
}

/// `None` when the event was acknowledged without touching the campaign.
pub async fn handle_webhook(
    state: &AppState,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<Option<RecordOutcome>, AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let event = construct_event(
        body,
        signature,
        state.config.stripe_webhook_secret.as_deref(),
        state.config.webhook_tolerance,
    )?;

    if event.kind != CHECKOUT_SESSION_COMPLETED {
        info!(event_id = %event.id, "Unhandled event type {}", event.kind);
        return Ok(None);
    }

    let session: CheckoutSession =
        serde_json::from_value(event.data.object).map_err(WebhookError::Payload)?;

    if !session.is_paid() {
        info!(
            session_id = %session.id,
            "Checkout session completed without settled payment, ignoring"
        );
        return Ok(None);
    }

    if !session.is_in_currency(CAMPAIGN_CURRENCY) {
        warn!(
            session_id = %session.id,
            currency = ?session.currency,
            "Checkout session not in campaign currency, ignoring"
        );
        return Ok(None);
    }

    let Some(amount) = session.amount_total.filter(|total| *total > 0) else {
        warn!(session_id = %session.id, "Paid checkout session has no amount, ignoring");
        return Ok(None);
    };

    record(
        state,
        ConfirmedDonation {
            payment_id: session.payment_key().to_string(),
            amount: Cents::new(amount),
            confirmed_at: Utc::now(),
        },
    )
    .await
    .map(Some)
}
