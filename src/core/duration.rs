use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::{core::consumer::Bounds, quantity::time::Hours};

pub const DEFAULT_TRIALS: u32 = 1000;

/// How to reduce a duration range to the expected duration.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "kebab-case")]
pub enum DurationEstimate {
    #[default]
    Midpoint,

    /// Mean of uniform samples from the range, reproducible for the same seed.
    MonteCarlo {
        #[serde(default = "default_trials")]
        trials: u32,

        #[serde(default)]
        seed: u64,
    },
}

const fn default_trials() -> u32 {
    DEFAULT_TRIALS
}

impl DurationEstimate {
    #[must_use]
    pub fn estimate(self, range: Bounds<Hours>) -> Hours {
        match self {
            Self::MonteCarlo { trials, seed }
                if trials != 0
                    && range.min < range.max
                    && (range.max - range.min).is_finite() =>
            {
                let mut rng = StdRng::seed_from_u64(seed);
                let total: f64 =
                    (0..trials).map(|_| rng.random_range(range.min.0..=range.max.0)).sum();
                Hours::from(total / f64::from(trials))
            }
            _ => range.min.midpoint(range.max),
        }
    }
}
