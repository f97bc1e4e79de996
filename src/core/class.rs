use std::num::NonZeroU8;

use serde::{Deserialize, Serialize};

/// Price class: `1` is the cheapest bucket, `K` the most expensive one.
#[derive(
    Copy,
    Clone,
    Debug,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[display("Class {_0}")]
pub struct PriceClass(NonZeroU8);

impl PriceClass {
    pub const CHEAPEST: Self = Self(NonZeroU8::MIN);

    #[must_use]
    pub const fn new(rank: NonZeroU8) -> Self {
        Self(rank)
    }

    /// Clamp the rank into `1..=num_classes`.
    #[must_use]
    pub fn clamped(rank: u8, num_classes: NonZeroU8) -> Self {
        Self(NonZeroU8::new(rank).unwrap_or(NonZeroU8::MIN).min(num_classes))
    }

    #[must_use]
    pub const fn rank(self) -> u8 {
        self.0.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(PriceClass::clamped(3, NonZeroU8::new(7).unwrap()).to_string(), "Class 3");
    }

    #[test]
    fn test_clamped() {
        let k = NonZeroU8::new(4).unwrap();
        assert_eq!(PriceClass::clamped(0, k).rank(), 1);
        assert_eq!(PriceClass::clamped(9, k).rank(), 4);
    }
}
