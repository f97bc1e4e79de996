use std::num::NonZeroU8;

use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::core::{
    class::PriceClass,
    slot::ClassifiedSeries,
    stats::{percentile, sorted},
};

/// Half-width of the ramp around each hour boundary.
pub const DEFAULT_TRANSITION_WINDOW_MINUTES: f64 = 7.5;

/// Throttle signal in percent: positive means run more, negative means throttle.
#[derive(Copy, Clone, Debug, Default, PartialEq, PartialOrd, Serialize)]
pub struct Adjustment(pub f64);

impl Adjustment {
    pub const MAX: Self = Self(100.0);
    pub const MIN: Self = Self(-100.0);

    #[must_use]
    pub fn clamped(value: f64) -> Self {
        Self(value.clamp(Self::MIN.0, Self::MAX.0))
    }
}

impl std::fmt::Display for Adjustment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:+.0}%", self.0)
    }
}

#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum AdjustmentSource {
    /// Linear from the cheapest class to the most expensive one.
    #[default]
    Class,

    /// Position of the price relative to the quartiles of the period.
    Quartile,
}

/// Linear interpolation between the current and the next value.
#[must_use]
pub fn interpolated_signal(current: f64, next: f64, fraction: f64) -> f64 {
    (next - current).mul_add(fraction.clamp(0.0, 1.0), current)
}

/// `+100` for the cheapest class down to `-100` for the most expensive one.
#[must_use]
pub fn class_adjustment(class: PriceClass, num_classes: NonZeroU8) -> Adjustment {
    if num_classes.get() == 1 {
        return Adjustment::default();
    }
    let position = f64::from(class.rank() - 1) / f64::from(num_classes.get() - 1);
    Adjustment::clamped(200.0f64.mul_add(-position, 100.0))
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, derive_more::Display)]
pub enum PriceRange {
    #[display("Lowest range")]
    Lowest,

    #[display("Lower-middle range")]
    LowerMiddle,

    #[display("Upper-middle range")]
    UpperMiddle,

    #[display("Highest range")]
    Highest,
}

/// Summary of a period's prices.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct Quartiles {
    pub lowest: f64,
    pub lower: f64,
    pub mean: f64,
    pub upper: f64,
    pub highest: f64,
}

impl Quartiles {
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn from_prices(prices: &[f64]) -> Option<Self> {
        let sorted = sorted(prices);
        Some(Self {
            lowest: *sorted.first()?,
            lower: percentile(&sorted, 0.25)?,
            mean: sorted.iter().sum::<f64>() / sorted.len() as f64,
            upper: percentile(&sorted, 0.75)?,
            highest: *sorted.last()?,
        })
    }

    #[must_use]
    pub fn range(&self, price: f64) -> PriceRange {
        if price <= self.lower {
            PriceRange::Lowest
        } else if price <= self.mean {
            PriceRange::LowerMiddle
        } else if price <= self.upper {
            PriceRange::UpperMiddle
        } else {
            PriceRange::Highest
        }
    }

    /// Ramp from `+100` at the cheapest price to `0` at the lower quartile, then down to `-100`
    /// at the upper quartile. Anything above is fully throttled.
    #[must_use]
    pub fn adjustment(&self, price: f64) -> Adjustment {
        if price <= self.lower {
            let span = self.lower - self.lowest;
            if span > 0.0 {
                Adjustment::clamped(100.0 - (price - self.lowest) / span * 100.0)
            } else {
                Adjustment::MAX
            }
        } else if price <= self.upper {
            let span = self.upper - self.lower;
            if span > 0.0 {
                Adjustment::clamped(-(price - self.lower) / span * 100.0)
            } else {
                Adjustment::default()
            }
        } else {
            Adjustment::MIN
        }
    }
}

/// Adjustment per slot of the series.
#[must_use]
pub fn adjustments(
    series: &ClassifiedSeries,
    source: AdjustmentSource,
    num_classes: NonZeroU8,
) -> Vec<Adjustment> {
    match source {
        AdjustmentSource::Class => {
            series.iter().map(|slot| class_adjustment(slot.class, num_classes)).collect()
        }
        AdjustmentSource::Quartile => {
            let rates = series.iter().map(|slot| slot.rate.0).collect::<Vec<_>>();
            Quartiles::from_prices(&rates).map_or_else(
                || vec![Adjustment::default(); series.len()],
                |quartiles| rates.iter().map(|rate| quartiles.adjustment(*rate)).collect(),
            )
        }
    }
}

/// Signal value at a moment, with what it was computed from.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct ThrottleSignal {
    pub value: Adjustment,
    pub from: Adjustment,
    pub to: Adjustment,
    pub fraction: f64,
}

/// Compute the signal at `now`, ramping across hour boundaries within the window.
///
/// Returns [`None`] when `now` is outside the series.
#[must_use]
pub fn throttle_signal(
    series: &ClassifiedSeries,
    adjustments: &[Adjustment],
    now: NaiveDateTime,
    window: TimeDelta,
) -> Option<ThrottleSignal> {
    let index = series.position(now)?;
    let slots = series.as_slice();
    let current = *adjustments.get(index)?;

    let ramp = if window > TimeDelta::zero() {
        let slot = slots[index];
        if now >= slot.interval.end - window
            && let Some(next) = adjustments.get(index + 1)
        {
            Some((current, *next, now - (slot.interval.end - window)))
        } else if now < slot.interval.start + window
            && let Some(previous) = index.checked_sub(1).and_then(|index| adjustments.get(index))
        {
            Some((*previous, current, now - (slot.interval.start - window)))
        } else {
            None
        }
    } else {
        None
    };

    Some(match ramp {
        Some((from, to, elapsed)) => {
            let fraction = elapsed.as_seconds_f64() / (window * 2).as_seconds_f64();
            ThrottleSignal {
                value: Adjustment::clamped(interpolated_signal(from.0, to.0, fraction)),
                from,
                to,
                fraction,
            }
        }
        None => ThrottleSignal { value: current, from: current, to: current, fraction: 0.0 },
    })
}

/// Convert fractional minutes to a time delta.
#[expect(clippy::cast_possible_truncation)]
#[must_use]
pub fn window_from_minutes(minutes: f64) -> TimeDelta {
    TimeDelta::milliseconds((minutes * 60_000.0).round() as i64)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;

    use super::*;
    use crate::{core::series::PriceSeries, prelude::*, quantity::rate::KilowattHourRate};

    fn k7() -> NonZeroU8 {
        NonZeroU8::new(7).unwrap()
    }

    fn at(hour: u32, minute: u32, second: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap().and_hms_opt(hour, minute, second).unwrap()
    }

    fn series(ranks: &[u8]) -> Result<ClassifiedSeries> {
        let prices = PriceSeries::hourly(
            at(0, 0, 0).date(),
            ranks.iter().map(|rank| KilowattHourRate::from(f64::from(*rank))),
        )?;
        Ok(ClassifiedSeries::new(
            &prices,
            ranks.iter().map(|rank| PriceClass::clamped(*rank, k7())),
        ))
    }

    #[test]
    fn test_interpolated_signal() {
        assert_abs_diff_eq!(interpolated_signal(10.0, 20.0, 0.0), 10.0);
        assert_abs_diff_eq!(interpolated_signal(10.0, 20.0, 0.25), 12.5);
        assert_abs_diff_eq!(interpolated_signal(10.0, 20.0, 1.0), 20.0);
        assert_abs_diff_eq!(interpolated_signal(10.0, 20.0, 2.0), 20.0);
        assert_abs_diff_eq!(interpolated_signal(10.0, 20.0, -1.0), 10.0);
    }

    #[test]
    fn test_class_adjustment() {
        assert_abs_diff_eq!(class_adjustment(PriceClass::clamped(1, k7()), k7()).0, 100.0);
        assert_abs_diff_eq!(class_adjustment(PriceClass::clamped(4, k7()), k7()).0, 0.0);
        assert_abs_diff_eq!(class_adjustment(PriceClass::clamped(7, k7()), k7()).0, -100.0);
        assert_abs_diff_eq!(class_adjustment(PriceClass::CHEAPEST, NonZeroU8::MIN).0, 0.0);
    }

    #[test]
    fn test_quartiles() {
        let quartiles = Quartiles::from_prices(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_abs_diff_eq!(quartiles.lower, 2.0);
        assert_abs_diff_eq!(quartiles.upper, 4.0);
        assert_eq!(quartiles.range(1.5), PriceRange::Lowest);
        assert_eq!(quartiles.range(2.5), PriceRange::LowerMiddle);
        assert_eq!(quartiles.range(3.5), PriceRange::UpperMiddle);
        assert_eq!(quartiles.range(4.5), PriceRange::Highest);
        assert_eq!(PriceRange::LowerMiddle.to_string(), "Lower-middle range");

        assert_abs_diff_eq!(quartiles.adjustment(1.0).0, 100.0);
        assert_abs_diff_eq!(quartiles.adjustment(1.5).0, 50.0);
        assert_abs_diff_eq!(quartiles.adjustment(3.0).0, -50.0);
        assert_abs_diff_eq!(quartiles.adjustment(4.0).0, -100.0);
        assert_abs_diff_eq!(quartiles.adjustment(10.0).0, -100.0);
        assert!(Quartiles::from_prices(&[]).is_none());
    }

    #[test]
    fn test_signal_is_bounded() -> Result {
        let series = series(&[1, 7, 3, 5, 2])?;
        for source in [AdjustmentSource::Class, AdjustmentSource::Quartile] {
            let adjustments = adjustments(&series, source, k7());
            for minute in 0..(5 * 60) {
                let now = at(0, 0, 0) + TimeDelta::minutes(minute);
                let signal =
                    throttle_signal(&series, &adjustments, now, TimeDelta::seconds(450)).unwrap();
                assert!(Adjustment::MIN <= signal.value && signal.value <= Adjustment::MAX);
            }
        }
        Ok(())
    }

    #[test]
    fn test_transition_window() -> Result {
        let series = series(&[1, 7])?;
        let adjustments = adjustments(&series, AdjustmentSource::Class, k7());
        let window = window_from_minutes(DEFAULT_TRANSITION_WINDOW_MINUTES);
        let value = |now| throttle_signal(&series, &adjustments, now, window).unwrap().value.0;

        assert_abs_diff_eq!(value(at(0, 30, 0)), 100.0);
        assert_abs_diff_eq!(value(at(0, 52, 30)), 100.0);
        assert_abs_diff_eq!(value(at(0, 56, 15)), 50.0);
        assert_abs_diff_eq!(value(at(1, 0, 0)), 0.0);
        assert_abs_diff_eq!(value(at(0, 59, 59)), 0.0, epsilon = 0.5);
        assert_abs_diff_eq!(value(at(1, 3, 45)), -50.0);
        assert_abs_diff_eq!(value(at(1, 7, 30)), -100.0);
        assert_abs_diff_eq!(value(at(1, 59, 0)), -100.0);
        Ok(())
    }

    #[test]
    fn test_outside_series() -> Result {
        let series = series(&[1])?;
        let adjustments = adjustments(&series, AdjustmentSource::Class, k7());
        assert!(throttle_signal(&series, &adjustments, at(5, 0, 0), TimeDelta::zero()).is_none());
        Ok(())
    }

    #[test]
    fn test_window_from_minutes() {
        assert_eq!(window_from_minutes(7.5), TimeDelta::seconds(450));
    }
}
