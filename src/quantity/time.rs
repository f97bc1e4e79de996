use std::fmt::{Display, Formatter};

use chrono::TimeDelta;

use crate::quantity::Quantity;

/// Fractional hours.
pub type Hours = Quantity<f64, 0, 1, 0>;

const MICROSECONDS_PER_HOUR: f64 = 3_600_000_000.0;

impl Display for Hours {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2} h", self.0)
    }
}

impl Hours {
    /// Round to microseconds, [`None`] if the value does not fit into a [`TimeDelta`].
    #[must_use]
    #[expect(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    pub fn to_time_delta(self) -> Option<TimeDelta> {
        let microseconds = (self.0 * MICROSECONDS_PER_HOUR).round();
        (microseconds.is_finite() && microseconds.abs() < i64::MAX as f64)
            .then(|| TimeDelta::microseconds(microseconds as i64))
    }
}

impl From<TimeDelta> for Hours {
    fn from(delta: TimeDelta) -> Self {
        Quantity(delta.as_seconds_f64() / 3600.0)
    }
}
