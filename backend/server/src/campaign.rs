//! # Campaign State
//!
//! The single aggregate the server tracks. Amounts are held in integer cents
//! and rendered as dollars on the wire. Derived fields (`familiesHelped`,
//! `averageDonation`) are recomputed from the counters on every change and
//! never set on their own.
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::milestones::{Milestone, Milestones, newly_crossed};

/// Currency every campaign amount is counted in.
pub const CAMPAIGN_CURRENCY: &str = "usd";

/// Cost of housing one family.
pub const FAMILY_COST: Cents = Cents::from_dollars(2_500);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cents(u64);

impl Cents {
    pub const ZERO: Cents = Cents(0);

    pub const fn new(cents: u64) -> Self {
        Self(cents)
    }

    pub const fn from_dollars(dollars: u64) -> Self {
        Self(dollars * 100)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    pub fn as_dollars(self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn checked_add(self, other: Cents) -> Option<Cents> {
        self.0.checked_add(other.0).map(Cents)
    }

    pub fn saturating_sub(self, other: Cents) -> Cents {
        Cents(self.0.saturating_sub(other.0))
    }
}

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Serialize for Cents {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_dollars())
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DonationError {
    #[error("Donation amount must be positive")]
    NonPositive,

    #[error("Donation would overflow the campaign total")]
    Overflow,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignState {
    current_amount: Cents,
    goal: Cents,
    donor_count: u64,
    families_helped: u64,
    average_donation: Option<f64>,
    last_donation: DateTime<Utc>,
    milestones: Milestones,
}

impl CampaignState {
    /// Starting record; milestones start unset even if the seed is past one.
    pub fn seeded(goal: Cents, amount: Cents, donors: u64, now: DateTime<Utc>) -> Self {
        let mut state = Self {
            current_amount: amount,
            goal,
            donor_count: donors,
            families_helped: 0,
            average_donation: None,
            last_donation: now,
            milestones: Milestones::default(),
        };
        state.refresh_derived();
        state
    }

    fn refresh_derived(&mut self) {
        self.families_helped = self.current_amount.get() / FAMILY_COST.get();
        self.average_donation = (self.donor_count > 0)
            .then(|| self.current_amount.as_dollars() / self.donor_count as f64);
    }

    pub fn current_amount(&self) -> Cents {
        self.current_amount
    }

    pub fn goal(&self) -> Cents {
        self.goal
    }

    pub fn donor_count(&self) -> u64 {
        self.donor_count
    }

    pub fn families_helped(&self) -> u64 {
        self.families_helped
    }

    pub fn average_donation(&self) -> Option<f64> {
        self.average_donation
    }

    pub fn last_donation(&self) -> DateTime<Utc> {
        self.last_donation
    }

    pub fn milestones(&self) -> &Milestones {
        &self.milestones
    }

    /// Unclamped share of the goal raised, in percent.
    pub fn percentage(&self) -> f64 {
        self.current_amount.as_dollars() / self.goal.as_dollars() * 100.0
    }
}

#[derive(Debug, Clone)]
pub struct AppliedDonation {
    pub state: CampaignState,
    pub milestones: Vec<Milestone>,
}

/// Folds one confirmed donation into `state`, returning the next state and the
/// milestones it newly crossed. `state` itself is left untouched.
pub fn apply_donation(
    state: &CampaignState,
    amount: Cents,
    at: DateTime<Utc>,
) -> Result<AppliedDonation, DonationError> {
    if amount == Cents::ZERO {
        return Err(DonationError::NonPositive);
    }

    let mut next = state.clone();
    next.current_amount = state
        .current_amount
        .checked_add(amount)
        .ok_or(DonationError::Overflow)?;
    next.donor_count = state
        .donor_count
        .checked_add(1)
        .ok_or(DonationError::Overflow)?;
    next.last_donation = at;
    next.refresh_derived();

    let crossed = newly_crossed(next.current_amount, next.goal, &next.milestones);
    for milestone in &crossed {
        next.milestones.mark(*milestone);
    }

    Ok(AppliedDonation {
        state: next,
        milestones: crossed,
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, hour, 0, 0).unwrap()
    }

    fn seed(amount: u64, donors: u64) -> CampaignState {
        CampaignState::seeded(
            Cents::from_dollars(1_000_000),
            Cents::from_dollars(amount),
            donors,
            at(0),
        )
    }

    #[test]
    fn test_seed_derives_fields() {
        let state = seed(12_750, 47);

        assert_eq!(state.families_helped(), 5);
        let average = state.average_donation().unwrap();
        assert!((average - 271.276).abs() < 0.001);
    }

    #[test]
    fn test_no_donors_has_no_average() {
        let state = seed(0, 0);

        assert_eq!(state.average_donation(), None);
        assert_eq!(state.families_helped(), 0);
    }

    #[test]
    fn test_apply_small_donation() {
        let state = seed(12_750, 47);

        let applied = apply_donation(&state, Cents::from_dollars(250), at(5)).unwrap();

        assert_eq!(applied.state.current_amount(), Cents::from_dollars(13_000));
        assert_eq!(applied.state.donor_count(), 48);
        assert_eq!(applied.state.families_helped(), 5);
        assert_eq!(applied.state.last_donation(), at(5));
        assert!(applied.milestones.is_empty());
        assert_eq!(state.donor_count(), 47);
    }

    #[test]
    fn test_ten_percent_flips_once() {
        let state = seed(99_000, 300);

        let first = apply_donation(&state, Cents::from_dollars(1_500), at(1)).unwrap();
        assert_eq!(first.state.current_amount(), Cents::from_dollars(100_500));
        assert_eq!(first.milestones, vec![Milestone::Ten]);
        assert!(first.state.milestones().is_reached(Milestone::Ten));

        let second = apply_donation(&first.state, Cents::from_dollars(10), at(2)).unwrap();
        assert!(second.milestones.is_empty());
        assert!(second.state.milestones().is_reached(Milestone::Ten));
    }

    #[test]
    fn test_zero_amount_rejected() {
        let state = seed(12_750, 47);

        assert_eq!(
            apply_donation(&state, Cents::ZERO, at(1)).unwrap_err(),
            DonationError::NonPositive
        );
    }

    #[test]
    fn test_derived_fields_hold_across_sequence() {
        let mut state = seed(0, 0);

        for (hour, dollars) in [(1, 40), (2, 2_500), (3, 7), (4, 12_345)] {
            state = apply_donation(&state, Cents::from_dollars(dollars), at(hour))
                .unwrap()
                .state;

            assert_eq!(
                state.families_helped(),
                state.current_amount().get() / FAMILY_COST.get()
            );
            let expected = state.current_amount().as_dollars() / state.donor_count() as f64;
            assert_eq!(state.average_donation(), Some(expected));
        }

        assert_eq!(state.donor_count(), 4);
        assert_eq!(state.current_amount(), Cents::from_dollars(14_892));
    }

    #[test]
    fn test_display_and_wire_format() {
        assert_eq!(Cents::new(1_300_005).to_string(), "$13000.05");

        let json = serde_json::to_value(seed(12_750, 47)).unwrap();
        assert_eq!(json["currentAmount"], 12750.0);
        assert_eq!(json["goal"], 1000000.0);
        assert_eq!(json["donorCount"], 47);
        assert_eq!(json["familiesHelped"], 5);
        assert_eq!(json["milestones"]["100%"], false);
    }
}
