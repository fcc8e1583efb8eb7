//! Donation campaign backend.
//!
//! Serves the landing page, reports campaign progress, and takes donations
//! through a hosted card processor.
//!
//!
//!
//! # Donation Flow
//! - Browser posts an amount to `/api/create-checkout-session` (hosted page) or
//!   `/api/create-payment-intent` (embedded card form)
//! - The processor settles the payment
//! - The processor delivers a signed `checkout.session.completed` webhook to
//!   `/api/stripe-webhook`; this is the authoritative path
//! - The browser may also report the intent to `/api/payment-success`; the
//!   server re-verifies it with the processor before counting it
//! - Either path may arrive first; the payment intent id is recorded so the
//!   other one becomes a no-op
//!
//!
//!
//! # State
//!
//! One in-memory campaign record behind [`store::CampaignStore`]. It is seeded
//! from configuration at startup and lost on restart. All writes go through a
//! single lock; reads are cloned snapshots.
//!
//!
//!
//! # Setup
//!
//! Run locally with test keys.
//! ```sh
//! STRIPE_SECRET_KEY=sk_test_... \
//! STRIPE_PUBLISHABLE_KEY=pk_test_... \
//! STRIPE_WEBHOOK_SECRET=whsec_... \
//! STATIC_DIR=backend/public \
//! RUST_LOG=info cargo run -p campaign
//! ```
//!
//! Send a signed test webhook.
//! ```sh
//! cargo run -p tester -- --secret whsec_... --amount 250
//! ```
//!
//! View current docs.
//! ```sh
//! cargo doc --open
//! ```
use std::{any::Any, sync::Arc, time::Duration};

use axum::{
    Router,
    handler::Handler,
    http::{
        HeaderValue, Method,
        header::{CONTENT_SECURITY_POLICY, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
    routing::{get, post},
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

pub mod campaign;
pub mod config;
pub mod donations;
pub mod error;
pub mod metrics;
pub mod milestones;
pub mod page;
pub mod payloads;
pub mod routes;
pub mod state;
pub mod store;

use config::Config;
use error::AppError;
use routes::{
    checkout_handler, health_handler, index_handler, metrics_handler, not_found_handler,
    payment_intent_handler, payment_success_handler, stats_handler, stripe_key_handler,
    webhook_handler,
};
use state::AppState;

const CONTENT_POLICY: &str = "default-src 'self'; \
    script-src 'self' 'unsafe-inline' https://js.stripe.com; \
    style-src 'self' 'unsafe-inline' https://fonts.googleapis.com; \
    font-src 'self' https://fonts.gstatic.com https:; \
    img-src 'self' data: https:; \
    connect-src 'self' https://api.stripe.com; \
    frame-src 'self' https://www.youtube.com https://js.stripe.com; \
    media-src 'self' https://www.youtube.com";

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| {
            HeaderValue::from_str(origin)
                .map_err(|e| warn!("Ignoring invalid CORS origin {origin}: {e}"))
                .ok()
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60))
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| panic.downcast_ref::<&str>().map(|s| s.to_string()))
        .unwrap_or_else(|| "handler panicked".to_string());

    AppError::InternalError(detail.into()).into_response()
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let static_files = ServeDir::new(&state.config.static_dir)
        .call_fallback_on_method_not_allowed(true)
        .not_found_service(not_found_handler.with_state(state.clone()));

    Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route("/health", get(health_handler))
        .route("/api/campaign-stats", get(stats_handler))
        .route("/api/campaign-metrics", get(metrics_handler))
        .route("/api/stripe-key", get(stripe_key_handler))
        .route("/api/create-checkout-session", post(checkout_handler))
        .route("/api/create-payment-intent", post(payment_intent_handler))
        .route("/api/payment-success", post(payment_success_handler))
        .route("/api/stripe-webhook", post(webhook_handler))
        .nest_service("/images", ServeDir::new(&state.config.images_dir))
        .fallback_service(static_files)
        .layer(SetResponseHeaderLayer::if_not_present(
            CONTENT_SECURITY_POLICY,
            HeaderValue::from_static(CONTENT_POLICY),
        ))
        .layer(cors_layer(&state.config))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_server() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Loading configuration...");
    let config = Config::load()?;

    info!("Initializing state...");
    let state = AppState::new(config)?;

    info!("Starting server...");
    let app = build_router(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    let snapshot = state.store.snapshot().await;
    info!("Current campaign total: {}", snapshot.current_amount());
    info!("Total donors: {}", snapshot.donor_count());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
