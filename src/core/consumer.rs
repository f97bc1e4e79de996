use enumset::EnumSet;
use serde::{Deserialize, Serialize};

use crate::{
    core::{acceptance::Priority, phase::Phase},
    quantity::{Quantity, power::Watts, time::Hours},
};

/// Longest run a consumer may ask for: the horizon of today's and tomorrow's prices.
pub const MAX_DURATION: Hours = Quantity(48.0);

/// Closed range of a quantity.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Bounds<T> {
    pub min: T,
    pub max: T,
}

impl<T: Copy + PartialOrd> Bounds<T> {
    pub const fn new(min: T, max: T) -> Self {
        Self { min, max }
    }

    pub fn is_inverted(&self) -> bool {
        self.min > self.max
    }
}

/// Deferrable load like a car charger or a dishwasher.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, bon::Builder)]
#[serde(deny_unknown_fields)]
pub struct Consumer {
    #[builder(into)]
    pub name: String,

    #[serde(rename = "duration_hours")]
    pub duration: Bounds<Hours>,

    #[serde(rename = "power_watts")]
    pub power: Bounds<Watts>,

    pub phases: EnumSet<Phase>,

    #[serde(default)]
    #[builder(default)]
    pub priority: Priority,
}

impl Consumer {
    #[must_use]
    pub fn average_power(&self) -> Watts {
        self.power.min.midpoint(self.power.max)
    }

    /// Describe what is wrong with the ranges or phases, if anything.
    #[must_use]
    pub fn configuration_problem(&self) -> Option<&'static str> {
        if !self.duration.min.is_finite() || !self.duration.max.is_finite() {
            Some("duration range is not finite")
        } else if self.duration.min <= Hours::ZERO {
            Some("duration range must be positive")
        } else if self.duration.is_inverted() {
            Some("duration range is inverted")
        } else if self.duration.max > MAX_DURATION {
            Some("duration range is longer than the price horizon")
        } else if !self.power.min.is_finite() || !self.power.max.is_finite() {
            Some("power range is not finite")
        } else if self.power.min <= Watts::ZERO {
            Some("power range must be positive")
        } else if self.power.is_inverted() {
            Some("power range is inverted")
        } else if self.phases.is_empty() {
            Some("no phases assigned")
        } else {
            None
        }
    }
}

/// Lifecycle of a consumer within a day. The scheduler only moves it from unscheduled to scheduled.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum ConsumerState {
    #[display("unscheduled")]
    Unscheduled,

    #[display("scheduled")]
    Scheduled,

    #[display("running")]
    Running,

    #[display("completed")]
    Completed,
}
