use std::fmt::{Display, Formatter};

use crate::quantity::Quantity;

pub type WattHours = Quantity<f64, 1, 1, 0>;

impl Display for WattHours {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.0.abs() >= 1000.0 {
            write!(f, "{:.2} kWh", self.0 / 1000.0)
        } else {
            write!(f, "{:.0} Wh", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantity::{power::Watts, time::Hours};

    #[test]
    fn test_power_times_time() {
        assert_eq!(Watts::from(2000.0) * Hours::from(1.5), WattHours::from(3000.0));
    }

    #[test]
    fn test_display() {
        assert_eq!(WattHours::from(500.0).to_string(), "500 Wh");
        assert_eq!(WattHours::from(3000.0).to_string(), "3.00 kWh");
    }
}
