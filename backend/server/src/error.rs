use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use gateway::{GatewayError, WebhookError};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Invalid amount. Minimum donation is {0}")]
    InvalidAmount(&'static str),

    #[error("Invalid currency")]
    InvalidCurrency,

    #[error("Webhook Error: {0}")]
    Webhook(#[from] WebhookError),

    #[error("Payment not completed")]
    PaymentNotCompleted,

    #[error("Donation rejected: {0}")]
    Donation(#[from] StoreError),

    #[error("{context}")]
    Gateway {
        context: &'static str,
        #[source]
        source: GatewayError,
    },

    #[error("Error loading page")]
    PageUnavailable(#[source] std::io::Error),

    #[error("Internal server error")]
    InternalError(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl AppError {
    pub fn gateway(context: &'static str) -> impl FnOnce(GatewayError) -> Self {
        move |source| AppError::Gateway { context, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MalformedPayload { .. }
            | AppError::InvalidAmount { .. }
            | AppError::InvalidCurrency
            | AppError::Webhook { .. }
            | AppError::PaymentNotCompleted
            | AppError::Donation { .. } => StatusCode::BAD_REQUEST,
            AppError::Gateway { .. }
            | AppError::PageUnavailable { .. }
            | AppError::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self {
            AppError::Gateway { context, source } => error!("{context}: {source}"),
            AppError::PageUnavailable(source) => error!("Error reading landing page: {source}"),
            AppError::InternalError(source) => error!("Server error: {source}"),
            AppError::Webhook(source) => warn!("Webhook rejected: {source}"),
            other => warn!("Request rejected: {other}"),
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
