use std::fmt::{Display, Formatter};

use crate::quantity::Quantity;

/// Currency per kilowatt-hour, as published by the price feed.
pub type KilowattHourRate = Quantity<f64, -1, -1, 1>;

impl Display for KilowattHourRate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3}/kWh", self.0)
    }
}
