//! # Campaign Store
//!
//! Storage seam for the campaign record. Handlers only see
//! [`CampaignStore`], so a durable backend can replace [`MemoryStore`]
//! without touching the arithmetic in [`crate::campaign`].
//!
//! ## Consistency
//!
//! - Every mutation runs inside one critical section: the duplicate check, the
//!   state update and the processed-payment insert happen together or not at
//!   all.
//! - Reads return a cloned snapshot taken under the same lock, so a reader
//!   never sees a half-applied donation.
//! - Nothing is persisted; state resets to the seed on restart.
use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::{
    campaign::{AppliedDonation, CampaignState, Cents, DonationError, apply_donation},
    milestones::Milestone,
};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Donation(#[from] DonationError),
}

/// A donation the gateway has confirmed as settled.
#[derive(Debug, Clone)]
pub struct ConfirmedDonation {
    /// Payment intent id (or checkout session id when there is no intent).
    pub payment_id: String,
    pub amount: Cents,
    pub confirmed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum RecordOutcome {
    Applied {
        state: CampaignState,
        milestones: Vec<Milestone>,
    },
    Duplicate {
        state: CampaignState,
    },
}

impl RecordOutcome {
    pub fn state(&self) -> &CampaignState {
        match self {
            RecordOutcome::Applied { state, .. } | RecordOutcome::Duplicate { state } => state,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, RecordOutcome::Applied { .. })
    }
}

#[async_trait]
pub trait CampaignStore: Send + Sync {
    async fn snapshot(&self) -> CampaignState;

    /// Applies `donation` at most once per `payment_id`.
    async fn record(&self, donation: ConfirmedDonation) -> Result<RecordOutcome, StoreError>;
}

struct Ledger {
    state: CampaignState,
    processed: HashSet<String>,
}

pub struct MemoryStore {
    ledger: Mutex<Ledger>,
}

impl MemoryStore {
    pub fn new(state: CampaignState) -> Self {
        Self {
            ledger: Mutex::new(Ledger {
                state,
                processed: HashSet::new(),
            }),
        }
    }
}

#[async_trait]
impl CampaignStore for MemoryStore {
    async fn snapshot(&self) -> CampaignState {
        self.ledger.lock().await.state.clone()
    }

    async fn record(&self, donation: ConfirmedDonation) -> Result<RecordOutcome, StoreError> {
        let mut ledger = self.ledger.lock().await;

        if ledger.processed.contains(&donation.payment_id) {
            return Ok(RecordOutcome::Duplicate {
                state: ledger.state.clone(),
            });
        }

        let AppliedDonation { state, milestones } =
            apply_donation(&ledger.state, donation.amount, donation.confirmed_at)?;

        ledger.state = state.clone();
        ledger.processed.insert(donation.payment_id);

        Ok(RecordOutcome::Applied { state, milestones })
    }
}
