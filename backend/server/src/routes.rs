use std::{collections::HashMap, sync::Arc};

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header::HOST},
    response::Html,
};
use chrono::Utc;
use gateway::{CheckoutRequest, GatewayError, PaymentIntentRequest};

use crate::{
    campaign::{CAMPAIGN_CURRENCY, CampaignState},
    donations::{bounded, confirm_payment_intent, handle_webhook},
    error::AppError,
    metrics::{CampaignMetrics, project},
    page::landing_page,
    payloads::{
        CheckoutPayload, CheckoutResponse, Health, PaymentIntentPayload, PaymentIntentResponse,
        PaymentSuccessPayload, PaymentSuccessResponse, PublishableKey, WebhookAck, parse_body,
    },
    state::AppState,
};

const CHECKOUT_FAILED: &str = "Unable to create checkout session";
const PAYMENT_INTENT_FAILED: &str = "Unable to create payment intent";

pub async fn index_handler(State(state): State<Arc<AppState>>) -> Result<Html<String>, AppError> {
    let html = landing_page(&state.config.index_path(), state.config.publishable_key()).await?;

    Ok(Html(html))
}

pub async fn not_found_handler(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Html<String>), AppError> {
    let html = landing_page(&state.config.index_path(), state.config.publishable_key()).await?;

    Ok((StatusCode::NOT_FOUND, Html(html)))
}

pub async fn stats_handler(State(state): State<Arc<AppState>>) -> Json<CampaignState> {
    Json(state.store.snapshot().await)
}

pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> Json<CampaignMetrics> {
    let snapshot = state.store.snapshot().await;

    Json(project(&snapshot, state.config.campaign_start, Utc::now()))
}

pub async fn stripe_key_handler(State(state): State<Arc<AppState>>) -> Json<PublishableKey> {
    Json(PublishableKey {
        publishable_key: state.config.stripe_publishable_key.clone(),
    })
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn redirect_base(state: &AppState, headers: &HeaderMap) -> String {
    if let Some(url) = &state.config.public_url {
        return url.trim_end_matches('/').to_string();
    }

    let protocol = header(headers, "x-forwarded-proto").unwrap_or("http");
    let host = header(headers, HOST.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| format!("localhost:{}", state.config.port));

    format!("{protocol}://{host}")
}

pub async fn checkout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<CheckoutResponse>, AppError> {
    let amount = parse_body::<CheckoutPayload>(&body)?.validated_amount()?;
    let base = redirect_base(&state, &headers);

    let request = CheckoutRequest {
        amount_cents: amount.get(),
        currency: CAMPAIGN_CURRENCY.to_string(),
        product_name: state.config.campaign_name.clone(),
        success_url: format!("{base}/success.html?session_id={{CHECKOUT_SESSION_ID}}"),
        cancel_url: format!("{base}/cancel.html"),
    };

    let session = bounded(
        state.config.gateway_timeout,
        state.gateway.create_checkout_session(request),
    )
    .await
    .map_err(AppError::gateway(CHECKOUT_FAILED))?;

    let url = session
        .url
        .ok_or(GatewayError::MissingField("url"))
        .map_err(AppError::gateway(CHECKOUT_FAILED))?;

    Ok(Json(CheckoutResponse { url }))
}

pub async fn payment_intent_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<PaymentIntentResponse>, AppError> {
    let payload = parse_body::<PaymentIntentPayload>(&body)?;
    let amount = payload.validated_amount()?;
    let currency = payload.validated_currency()?;

    let request = PaymentIntentRequest {
        amount_cents: amount.get(),
        currency,
        metadata: HashMap::from([
            ("campaign".to_string(), state.config.campaign_slug.clone()),
            ("timestamp".to_string(), Utc::now().to_rfc3339()),
        ]),
    };

    let intent = bounded(
        state.config.gateway_timeout,
        state.gateway.create_payment_intent(request),
    )
    .await
    .map_err(AppError::gateway(PAYMENT_INTENT_FAILED))?;

    Ok(Json(PaymentIntentResponse {
        client_secret: intent.client_secret,
        amount: intent.amount,
    }))
}

pub async fn payment_success_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<PaymentSuccessResponse>, AppError> {
    let payload = parse_body::<PaymentSuccessPayload>(&body)?;

    let outcome = confirm_payment_intent(&state, &payload).await?;

    Ok(Json(PaymentSuccessResponse {
        success: true,
        message: "Thank you for your donation!",
        recorded: outcome.is_applied(),
        campaign_data: outcome.state().clone(),
    }))
}

pub async fn webhook_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, AppError> {
    handle_webhook(&state, &headers, &body).await?;

    Ok(Json(WebhookAck { received: true }))
}

pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Health> {
    Json(Health {
        status: "healthy",
        timestamp: Utc::now(),
        campaign: state.store.snapshot().await,
    })
}
