use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

use crate::{prelude::*, quantity::rate::KilowattHourRate};

pub type Point<K, V> = (K, V);

/// Chronological series of prices with unique timestamps.
#[derive(Clone, Debug, Default, derive_more::IntoIterator)]
#[must_use]
pub struct PriceSeries(#[into_iterator(owned, ref)] Vec<Point<NaiveDateTime, KilowattHourRate>>);

impl PriceSeries {
    /// Build an hourly series for the whole `date`, the first rate being `00:00-01:00`.
    pub fn hourly(
        date: NaiveDate,
        rates: impl IntoIterator<Item = KilowattHourRate>,
    ) -> Result<Self> {
        let mut series = Self::default();
        let mut time = Some(date.and_time(chrono::NaiveTime::MIN));
        for rate in rates {
            let start = time.context("the prices run past the end of the calendar")?;
            series.try_push(start, rate)?;
            time = start.checked_add_signed(TimeDelta::hours(1));
        }
        Ok(series)
    }

    pub fn try_push(&mut self, time: NaiveDateTime, rate: KilowattHourRate) -> Result {
        if let Some((last_time, _)) = self.0.last() {
            ensure!(
                *last_time < time,
                "prices must be chronological with unique timestamps: {time} follows {last_time}",
            );
        }
        self.0.push((time, rate));
        Ok(())
    }

    /// Append the other series, for example tomorrow's prices after today's.
    ///
    /// On error, the series is left unchanged.
    pub fn try_extend(&mut self, other: Self) -> Result {
        if let (Some((last_time, _)), Some((next_time, _))) = (self.0.last(), other.0.first()) {
            ensure!(
                last_time < next_time,
                "prices must be chronological with unique timestamps: {next_time} follows {last_time}",
            );
        }
        self.0.extend(other.0);
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Point<NaiveDateTime, KilowattHourRate>> {
        self.0.iter()
    }

    #[must_use]
    pub fn raw_rates(&self) -> Vec<f64> {
        self.0.iter().map(|(_, rate)| rate.0).collect()
    }
}
