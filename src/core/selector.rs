use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use itertools::Itertools;
use serde::{Serialize, Serializer, ser::SerializeStruct};

use crate::core::{
    acceptance::{AcceptanceLevel, AcceptancePolicy, Priority},
    interval::Interval,
    slot::{ClassifiedSeries, TimeSlot},
};

/// All slots whose class is acceptable for the priority, in chronological order.
#[must_use]
pub fn select_slots(
    series: &ClassifiedSeries,
    policy: &AcceptancePolicy,
    priority: Priority,
) -> Vec<TimeSlot> {
    series.iter().filter(|slot| policy.accepts(priority, slot.class)).copied().collect()
}

/// Run of consecutive acceptable slots within one calendar day.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MergedInterval(pub Interval);

impl MergedInterval {
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.0.start.date()
    }

    #[must_use]
    pub fn start_label(&self) -> String {
        self.0.start.format("%H:%M").to_string()
    }

    /// End time, midnight of the next day is rendered as `24:00`.
    #[must_use]
    pub fn end_label(&self) -> String {
        if self.0.end.date() > self.date() && self.0.end.time() == NaiveTime::MIN {
            "24:00".to_string()
        } else {
            self.0.end.format("%H:%M").to_string()
        }
    }

    #[must_use]
    pub fn contains(&self, time: NaiveDateTime) -> bool {
        self.0.contains(time)
    }
}

impl std::fmt::Display for MergedInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}-{}", self.date(), self.start_label(), self.end_label())
    }
}

impl Serialize for MergedInterval {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("MergedInterval", 3)?;
        state.serialize_field("date", &self.date())?;
        state.serialize_field("start", &self.start_label())?;
        state.serialize_field("end", &self.end_label())?;
        state.end()
    }
}

/// Merge adjacent slots into intervals. Runs are split at midnight.
#[must_use]
pub fn merge(slots: &[TimeSlot]) -> Vec<MergedInterval> {
    slots
        .iter()
        .map(|slot| slot.interval)
        .coalesce(|lhs, rhs| {
            if lhs.end == rhs.start && lhs.start.date() == rhs.start.date() {
                Ok(Interval::new(lhs.start, rhs.end))
            } else {
                Err((lhs, rhs))
            }
        })
        .map(MergedInterval)
        .collect()
}

/// Merged acceptable intervals for every level of the policy.
#[must_use]
pub fn available_intervals(
    series: &ClassifiedSeries,
    policy: &AcceptancePolicy,
) -> Vec<(AcceptanceLevel, Vec<MergedInterval>)> {
    policy
        .levels()
        .iter()
        .map(|level| (*level, merge(&select_slots(series, policy, level.priority))))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU8;

    use chrono::{TimeDelta, Timelike};

    use super::*;
    use crate::{
        core::{class::PriceClass, series::PriceSeries},
        prelude::*,
        quantity::rate::KilowattHourRate,
    };

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn classified(ranks: &[u8]) -> Result<ClassifiedSeries> {
        let series = PriceSeries::hourly(
            day(),
            ranks.iter().map(|rank| KilowattHourRate::from(f64::from(*rank))),
        )?;
        Ok(ClassifiedSeries::new(
            &series,
            ranks.iter().map(|rank| PriceClass::clamped(*rank, NonZeroU8::new(7).unwrap())),
        ))
    }

    #[test]
    fn test_select_slots() -> Result {
        let series = classified(&[1, 3, 2, 5, 1])?;
        let policy = AcceptancePolicy::default();
        let hours = select_slots(&series, &policy, 3)
            .iter()
            .map(|slot| slot.interval.start.hour())
            .collect_vec();
        assert_eq!(hours, [0, 2, 4]);
        assert!(select_slots(&series, &policy, 0).is_empty());
        Ok(())
    }

    #[test]
    fn test_merge() -> Result {
        let series = classified(&[1, 1, 7, 1, 1, 1])?;
        let intervals = merge(&select_slots(&series, &AcceptancePolicy::default(), 1));
        let labels = intervals.iter().map(ToString::to_string).collect_vec();
        assert_eq!(labels, ["2026-10-19 00:00-02:00", "2026-10-19 03:00-06:00"]);
        Ok(())
    }

    #[test]
    fn test_merged_intervals_do_not_touch() -> Result {
        let series = classified(&[1, 2, 1, 6, 7, 1, 3, 3, 2, 1])?;
        let policy = AcceptancePolicy::default();
        for level in policy.levels() {
            let intervals = merge(&select_slots(&series, &policy, level.priority));
            for (lhs, rhs) in intervals.iter().tuple_windows() {
                assert!(lhs.0.end < rhs.0.start);
            }
        }
        Ok(())
    }

    #[test]
    fn test_merge_splits_at_midnight() -> Result {
        let mut series = PriceSeries::hourly(day(), vec![KilowattHourRate::from(1.0); 24])?;
        series.try_extend(PriceSeries::hourly(
            day() + TimeDelta::days(1),
            vec![KilowattHourRate::from(1.0); 2],
        )?)?;
        let classified = ClassifiedSeries::new(&series, vec![PriceClass::CHEAPEST; 26]);
        let intervals = merge(classified.as_slice());
        let labels = intervals.iter().map(ToString::to_string).collect_vec();
        assert_eq!(labels, ["2026-10-19 00:00-24:00", "2026-10-20 00:00-02:00"]);
        Ok(())
    }

    /// Merging neither loses nor adds minutes, also across midnight.
    #[test]
    fn test_merge_covers_selected_slots() -> Result {
        let ranks = (0..48_u8)
            .map(|hour| if (22..=25).contains(&hour) { 1 } else { (hour * 5 + 3) % 7 + 1 })
            .collect_vec();
        let mut series = PriceSeries::hourly(
            day(),
            ranks[..24].iter().map(|rank| KilowattHourRate::from(f64::from(*rank))),
        )?;
        series.try_extend(PriceSeries::hourly(
            day() + TimeDelta::days(1),
            ranks[24..].iter().map(|rank| KilowattHourRate::from(f64::from(*rank))),
        )?)?;
        let series = ClassifiedSeries::new(
            &series,
            ranks.iter().map(|rank| PriceClass::clamped(*rank, NonZeroU8::new(7).unwrap())),
        );
        let policy = AcceptancePolicy::default();

        for level in policy.levels() {
            let slots = select_slots(&series, &policy, level.priority);
            let intervals = merge(&slots);

            let merged_minutes: i64 = intervals
                .iter()
                .map(|interval| (interval.0.end - interval.0.start).num_minutes())
                .sum();
            assert_eq!(merged_minutes, 60 * i64::try_from(slots.len())?, "{level:?}");

            for slot in &slots {
                let n_covering = intervals
                    .iter()
                    .filter(|interval| {
                        interval.0.start <= slot.interval.start
                            && slot.interval.end <= interval.0.end
                    })
                    .count();
                assert_eq!(n_covering, 1, "{level:?}: {:?}", slot.interval);
            }
            for interval in &intervals {
                assert_eq!(interval.date(), (interval.0.end - TimeDelta::seconds(1)).date());
            }
        }

        let cheapest = merge(&select_slots(&series, &policy, 1))
            .iter()
            .map(ToString::to_string)
            .collect_vec();
        assert!(cheapest.contains(&"2026-10-19 22:00-24:00".to_string()), "{cheapest:?}");
        assert!(cheapest.contains(&"2026-10-20 00:00-03:00".to_string()), "{cheapest:?}");
        Ok(())
    }

    #[test]
    fn test_serialize() -> Result {
        let series = classified(&[1, 1])?;
        let intervals = merge(series.as_slice());
        assert_eq!(
            serde_json::to_string(&intervals)?,
            r#"[{"date":"2026-10-19","start":"00:00","end":"02:00"}]"#,
        );
        Ok(())
    }

    #[test]
    fn test_available_intervals() -> Result {
        let series = classified(&[1, 2, 3, 4, 5, 6, 7])?;
        let intervals = available_intervals(&series, &AcceptancePolicy::default());
        assert_eq!(intervals.len(), 5);
        let (level, highest) = intervals.last().unwrap();
        assert_eq!(level.priority, 5);
        assert_eq!(highest[0].to_string(), "2026-10-19 00:00-05:00");
        Ok(())
    }
}
