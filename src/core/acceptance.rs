use std::num::NonZeroU8;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{core::class::PriceClass, prelude::*};

/// Consumer priority, the higher the more urgent.
pub type Priority = u8;

/// Consumers of the priority and above may run in classes `1..=max_class`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AcceptanceLevel {
    pub priority: Priority,
    pub max_class: u8,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AcceptancePolicy(Vec<AcceptanceLevel>);

impl Default for AcceptancePolicy {
    fn default() -> Self {
        Self(Self::default_levels())
    }
}

impl AcceptancePolicy {
    #[must_use]
    pub fn default_levels() -> Vec<AcceptanceLevel> {
        [(1, 1), (2, 1), (3, 2), (4, 3), (5, 5)]
            .into_iter()
            .map(|(priority, max_class)| AcceptanceLevel { priority, max_class })
            .collect()
    }

    /// Build the policy ensuring that a higher priority never accepts fewer classes.
    pub fn try_new(mut levels: Vec<AcceptanceLevel>) -> Result<Self> {
        levels.sort_by_key(|level| level.priority);
        for (lower, higher) in levels.iter().tuple_windows() {
            ensure!(
                lower.priority != higher.priority,
                "priority {} has more than one acceptance level",
                lower.priority,
            );
            ensure!(
                lower.max_class <= higher.max_class,
                "priority {} accepts up to class {}, but the higher priority {} only up to class {}",
                lower.priority,
                lower.max_class,
                higher.priority,
                higher.max_class,
            );
        }
        Ok(Self(levels))
    }

    /// Levels in ascending priority.
    #[must_use]
    pub fn levels(&self) -> &[AcceptanceLevel] {
        &self.0
    }

    /// The most expensive class acceptable for the priority, [`None`] if nothing is.
    #[must_use]
    pub fn max_class(&self, priority: Priority) -> Option<PriceClass> {
        self.0
            .iter()
            .rev()
            .find(|level| level.priority <= priority)
            .and_then(|level| NonZeroU8::new(level.max_class))
            .map(PriceClass::new)
    }

    #[must_use]
    pub fn accepts(&self, priority: Priority, class: PriceClass) -> bool {
        self.max_class(priority).is_some_and(|max_class| class <= max_class)
    }
}
