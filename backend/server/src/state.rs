use std::sync::Arc;

use chrono::Utc;
use gateway::{PaymentGateway, stripe::StripeClient};
use tracing::warn;

use super::{
    campaign::CampaignState,
    config::Config,
    store::{CampaignStore, MemoryStore},
};

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn CampaignStore>,
    pub gateway: Arc<dyn PaymentGateway>,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Arc<Self>> {
        if config.stripe_secret_key.is_none() {
            warn!("Warning: STRIPE_SECRET_KEY not set, gateway calls will fail");
        }
        if config.stripe_publishable_key.is_none() {
            warn!("Warning: STRIPE_PUBLISHABLE_KEY not set");
        }
        if config.stripe_webhook_secret.is_none() {
            warn!("Warning: STRIPE_WEBHOOK_SECRET not set, webhooks will be rejected");
        }

        let gateway = StripeClient::new(
            &config.stripe_api_base,
            config.stripe_secret_key.clone(),
            config.gateway_timeout,
        )?;

        let seed = CampaignState::seeded(
            config.goal,
            config.seed_amount,
            config.seed_donors,
            Utc::now(),
        );

        Ok(Self::with_parts(
            config,
            Arc::new(MemoryStore::new(seed)),
            Arc::new(gateway),
        ))
    }

    pub fn with_parts(
        config: Config,
        store: Arc<dyn CampaignStore>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            store,
            gateway,
        })
    }
}
