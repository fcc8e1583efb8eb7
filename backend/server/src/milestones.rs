//! # Milestones
//!
//! Fixed percentage-of-goal thresholds. A threshold is crossed once
//! `current / goal * 100 >= percent`; the comparison is done in integer cents
//! (`current * 100 >= goal * percent`) so 10% of $1M is reached at exactly
//! $100,000 with no float rounding.
use serde::{Serialize, Serializer, ser::SerializeMap};

use crate::campaign::Cents;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Milestone {
    Ten,
    TwentyFive,
    Fifty,
    SeventyFive,
    Hundred,
}

impl Milestone {
    pub const ALL: [Milestone; 5] = [
        Milestone::Ten,
        Milestone::TwentyFive,
        Milestone::Fifty,
        Milestone::SeventyFive,
        Milestone::Hundred,
    ];

    pub fn percent(self) -> u64 {
        match self {
            Milestone::Ten => 10,
            Milestone::TwentyFive => 25,
            Milestone::Fifty => 50,
            Milestone::SeventyFive => 75,
            Milestone::Hundred => 100,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Milestone::Ten => "10%",
            Milestone::TwentyFive => "25%",
            Milestone::Fifty => "50%",
            Milestone::SeventyFive => "75%",
            Milestone::Hundred => "100%",
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    pub fn is_reached_by(self, current: Cents, goal: Cents) -> bool {
        u128::from(current.get()) * 100 >= u128::from(goal.get()) * u128::from(self.percent())
    }
}

/// Reached flags, serialized as `{"10%": bool, ..., "100%": bool}` in
/// threshold order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Milestones([bool; 5]);

impl Milestones {
    pub fn is_reached(&self, milestone: Milestone) -> bool {
        self.0[milestone.index()]
    }

    /// Flags only ever go from false to true.
    pub fn mark(&mut self, milestone: Milestone) {
        self.0[milestone.index()] = true;
    }
}

impl Serialize for Milestones {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Milestone::ALL.len()))?;
        for milestone in Milestone::ALL {
            map.serialize_entry(milestone.label(), &self.is_reached(milestone))?;
        }
        map.end()
    }
}

/// Thresholds reached by `current` that are not yet flagged, ascending.
pub fn newly_crossed(current: Cents, goal: Cents, reached: &Milestones) -> Vec<Milestone> {
    Milestone::ALL
        .into_iter()
        .filter(|milestone| !reached.is_reached(*milestone) && milestone.is_reached_by(current, goal))
        .collect()
}
