use std::{env, fmt::Display, fs::read_to_string, path::PathBuf, str::FromStr, time::Duration};

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;
use tracing::{info, warn};

use crate::campaign::Cents;

pub const PUBLISHABLE_KEY_PLACEHOLDER: &str = "YOUR_STRIPE_PUBLISHABLE_KEY";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("CAMPAIGN_GOAL must be greater than zero")]
    ZeroGoal,
}

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub stripe_secret_key: Option<String>,
    pub stripe_publishable_key: Option<String>,
    pub stripe_webhook_secret: Option<String>,
    pub stripe_api_base: String,
    pub gateway_timeout: Duration,
    pub webhook_tolerance: Duration,
    pub goal: Cents,
    pub campaign_start: DateTime<Utc>,
    pub seed_amount: Cents,
    pub seed_donors: u64,
    pub campaign_name: String,
    pub campaign_slug: String,
    pub static_dir: PathBuf,
    pub images_dir: PathBuf,
    pub allowed_origins: Vec<String>,
    pub public_url: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let goal = load_dollars(&lookup, "CAMPAIGN_GOAL", "1000000")?;
        if goal == Cents::ZERO {
            return Err(ConfigError::ZeroGoal);
        }

        let start: NaiveDate = try_load(&lookup, "CAMPAIGN_START", "2025-01-01")?;
        let origins: String = try_load(
            &lookup,
            "ALLOWED_ORIGINS",
            "http://localhost:3000,https://localhost:3000",
        )?;

        Ok(Self {
            port: try_load(&lookup, "PORT", "3000")?,
            stripe_secret_key: read_secret(&lookup, "STRIPE_SECRET_KEY"),
            stripe_publishable_key: read_secret(&lookup, "STRIPE_PUBLISHABLE_KEY"),
            stripe_webhook_secret: read_secret(&lookup, "STRIPE_WEBHOOK_SECRET"),
            stripe_api_base: try_load(&lookup, "STRIPE_API_BASE", gateway::stripe::DEFAULT_API_BASE)?,
            gateway_timeout: Duration::from_millis(try_load(&lookup, "GATEWAY_TIMEOUT_MS", "10000")?),
            webhook_tolerance: Duration::from_secs(try_load(&lookup, "WEBHOOK_TOLERANCE_SECS", "300")?),
            goal,
            campaign_start: start.and_time(chrono::NaiveTime::MIN).and_utc(),
            seed_amount: load_dollars(&lookup, "SEED_AMOUNT", "12750")?,
            seed_donors: try_load(&lookup, "SEED_DONORS", "47")?,
            campaign_name: try_load(&lookup, "CAMPAIGN_NAME", "Omaha Housing Initiative Donation")?,
            campaign_slug: try_load(&lookup, "CAMPAIGN_SLUG", "omaha-housing-initiative")?,
            static_dir: try_load(&lookup, "STATIC_DIR", "public")?,
            images_dir: try_load(&lookup, "IMAGES_DIR", "images")?,
            allowed_origins: origins
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_string)
                .collect(),
            public_url: lookup("PUBLIC_URL").filter(|url| !url.is_empty()),
        })
    }

    pub fn publishable_key(&self) -> &str {
        self.stripe_publishable_key
            .as_deref()
            .unwrap_or(PUBLISHABLE_KEY_PLACEHOLDER)
    }

    pub fn index_path(&self) -> PathBuf {
        self.static_dir.join("index.html")
    }
}

fn try_load<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: &str,
) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let value = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    value.parse().map_err(|e: T::Err| {
        warn!("Invalid {key} value: {e}");
        ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }
    })
}

fn load_dollars(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: &str,
) -> Result<Cents, ConfigError> {
    let dollars: u64 = try_load(lookup, key, default)?;

    dollars
        .checked_mul(100)
        .map(Cents::new)
        .ok_or_else(|| ConfigError::Invalid {
            key,
            value: dollars.to_string(),
            reason: "amount too large".to_string(),
        })
}

fn read_secret(lookup: &impl Fn(&str) -> Option<String>, secret_name: &str) -> Option<String> {
    if let Some(value) = lookup(secret_name).filter(|value| !value.trim().is_empty()) {
        return Some(value.trim().to_string());
    }

    let path = format!("/run/secrets/{secret_name}");

    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .map_err(|e| {
            warn!("{secret_name} not set and unreadable from {path}: {e}");
        })
        .ok()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();

        assert_eq!(config.port, 3000);
        assert_eq!(config.goal, Cents::from_dollars(1_000_000));
        assert_eq!(config.seed_amount, Cents::from_dollars(12_750));
        assert_eq!(config.seed_donors, 47);
        assert_eq!(config.campaign_start.to_rfc3339(), "2025-01-01T00:00:00+00:00");
        assert_eq!(config.allowed_origins.len(), 2);
        assert_eq!(config.gateway_timeout, Duration::from_secs(10));
        assert_eq!(config.static_dir, PathBuf::from("public"));
        assert_eq!(config.images_dir, PathBuf::from("images"));
    }

    #[test]
    fn test_zero_goal_rejected() {
        assert!(matches!(
            load(&[("CAMPAIGN_GOAL", "0")]),
            Err(ConfigError::ZeroGoal)
        ));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            load(&[("PORT", "eighty")]),
            Err(ConfigError::Invalid { key: "PORT", .. })
        ));
        assert!(matches!(
            load(&[("CAMPAIGN_START", "01/01/2025")]),
            Err(ConfigError::Invalid { key: "CAMPAIGN_START", .. })
        ));
    }

    #[test]
    fn test_secrets_and_placeholder() {
        let config = load(&[
            ("STRIPE_PUBLISHABLE_KEY", " pk_test_123 \n"),
            ("STRIPE_WEBHOOK_SECRET", "whsec_abc"),
        ])
        .unwrap();

        assert_eq!(config.publishable_key(), "pk_test_123");
        assert_eq!(config.stripe_webhook_secret.as_deref(), Some("whsec_abc"));

        let config = load(&[("STRIPE_PUBLISHABLE_KEY", "")]).unwrap();
        assert_eq!(config.publishable_key(), PUBLISHABLE_KEY_PLACEHOLDER);
    }
}
