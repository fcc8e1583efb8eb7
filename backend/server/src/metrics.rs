use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::campaign::{CampaignState, Cents};

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Read-only projection over a [`CampaignState`] snapshot. Recomputed on every
/// request; nothing here is stored.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignMetrics {
    #[serde(flatten)]
    pub state: CampaignState,
    pub percentage: f64,
    pub remaining: Cents,
    pub days_since_start: i64,
    pub average_daily: f64,
    pub projected_completion_days: u64,
    pub is_on_track: bool,
}

/// Whole days started since `start`, never less than one.
pub fn days_since(start: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let seconds = (now - start).num_seconds();
    let days = seconds.div_euclid(SECONDS_PER_DAY) + i64::from(seconds.rem_euclid(SECONDS_PER_DAY) != 0);

    days.max(1)
}

pub fn project(state: &CampaignState, start: DateTime<Utc>, now: DateTime<Utc>) -> CampaignMetrics {
    let raw_percentage = state.percentage();
    let remaining = state.goal().saturating_sub(state.current_amount());
    let days_since_start = days_since(start, now);

    let average_daily = state.current_amount().as_dollars() / days_since_start as f64;
    let projected_completion_days = (remaining.as_dollars() / average_daily.max(1.0)).ceil() as u64;
    let is_on_track = raw_percentage >= days_since_start as f64 / 365.0 * 100.0;

    CampaignMetrics {
        state: state.clone(),
        percentage: raw_percentage.min(100.0),
        remaining,
        days_since_start,
        average_daily,
        projected_completion_days,
        is_on_track,
    }
}
