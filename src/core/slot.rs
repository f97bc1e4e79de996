use std::collections::BTreeMap;

use chrono::{NaiveDateTime, TimeDelta};
use itertools::Itertools;

use crate::{
    core::{class::PriceClass, interval::Interval, series::PriceSeries},
    quantity::rate::KilowattHourRate,
};

/// State reported when there is no class for the current hour.
pub const UNKNOWN_STATE: &str = "unknown";

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TimeSlot {
    pub interval: Interval,
    pub class: PriceClass,
    pub rate: KilowattHourRate,
}

impl TimeSlot {
    /// Attribute key like `2026-10-19 13:00-14:00`.
    #[must_use]
    pub fn key(&self) -> String {
        format!(
            "{} {}-{}",
            self.interval.start.date(),
            self.interval.start.format("%H:%M"),
            self.interval.end.format("%H:%M"),
        )
    }
}

/// Price series with classes assigned: contiguous slots in chronological order.
#[derive(Clone, Debug, Default, derive_more::IntoIterator)]
#[must_use]
pub struct ClassifiedSeries(#[into_iterator(owned, ref)] Vec<TimeSlot>);

impl ClassifiedSeries {
    /// Zip the prices with their classes.
    ///
    /// Each slot ends where the next one starts, the last one lasts as long as the previous one
    /// (or an hour when there is only one).
    pub fn new(series: &PriceSeries, classes: impl IntoIterator<Item = PriceClass>) -> Self {
        let points = series.iter().collect_vec();
        let last_step = points
            .iter()
            .rev()
            .tuple_windows()
            .next()
            .map_or_else(|| TimeDelta::hours(1), |(last, previous)| last.0 - previous.0);
        let ends = points
            .iter()
            .skip(1)
            .map(|(time, _)| *time)
            .chain(points.last().map(|(time, _)| *time + last_step));
        Self(
            points
                .iter()
                .zip(ends)
                .zip(classes)
                .map(|(((start, rate), end), class)| TimeSlot {
                    interval: Interval::new(*start, end),
                    class,
                    rate: *rate,
                })
                .collect(),
        )
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimeSlot> {
        self.0.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[TimeSlot] {
        &self.0
    }

    /// Index of the slot containing the time.
    #[must_use]
    pub fn position(&self, time: NaiveDateTime) -> Option<usize> {
        self.0.iter().position(|slot| slot.interval.contains(time))
    }

    #[must_use]
    pub fn at(&self, time: NaiveDateTime) -> Option<&TimeSlot> {
        self.position(time).map(|index| &self.0[index])
    }

    /// Current class label, or the unknown state when the time is not covered.
    #[must_use]
    pub fn state_at(&self, time: NaiveDateTime) -> String {
        self.at(time).map_or_else(|| UNKNOWN_STATE.to_string(), |slot| slot.class.to_string())
    }

    /// One `"Class N"` attribute per slot.
    #[must_use]
    pub fn attributes(&self) -> BTreeMap<String, String> {
        self.0.iter().map(|slot| (slot.key(), slot.class.to_string())).collect()
    }
}
