use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use serde::Deserialize;
use serde_with::{DefaultOnError, DisplayFromStr, PickFirst, serde_as};

use crate::{
    api::feed::{PriceFeed, SwitchFeed},
    core::series::PriceSeries,
    prelude::*,
    quantity::rate::KilowattHourRate,
};

/// Price sensor state as exposed by the home automation host.
///
/// Prices may be numbers or numeric strings. Anything else, like `"unknown"`, marks the price
/// as not published.
#[serde_as]
#[derive(Clone, Debug, Deserialize)]
pub struct Snapshot {
    /// Date of the `today` prices.
    pub date: NaiveDate,

    #[serde_as(as = "Vec<DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>>")]
    pub today: Vec<Option<f64>>,

    #[serde_as(as = "Option<Vec<DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>>>")]
    pub tomorrow: Option<Vec<Option<f64>>>,

    /// Switch entity states by consumer name.
    #[serde(default)]
    pub switches: BTreeMap<String, SwitchState>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwitchState {
    On,
    Off,

    /// Like `unavailable` while the switch is offline.
    #[serde(other)]
    Unknown,
}

impl SwitchState {
    #[must_use]
    pub const fn is_on(self) -> Option<bool> {
        match self {
            Self::On => Some(true),
            Self::Off => Some(false),
            Self::Unknown => None,
        }
    }
}

impl Snapshot {
    pub fn read_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read `{}`", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse `{}`", path.display()))
    }

    fn day(&self, on: NaiveDate) -> Option<&[Option<f64>]> {
        if on == self.date {
            Some(&self.today)
        } else if self.date.succ_opt() == Some(on) {
            self.tomorrow.as_deref()
        } else {
            None
        }
    }
}

impl PriceFeed for Snapshot {
    fn get_prices(&self, on: NaiveDate) -> Result<Option<PriceSeries>> {
        let Some(prices) = self.day(on) else {
            debug!(%on, snapshot_date = %self.date, "The snapshot has no prices for the date");
            return Ok(None);
        };
        if prices.is_empty() {
            return Ok(None);
        }
        let Some(prices) = prices.iter().copied().collect::<Option<Vec<_>>>() else {
            warn!(%on, "Some prices are unknown, treating the day as unavailable");
            return Ok(None);
        };
        PriceSeries::hourly(on, prices.into_iter().map(KilowattHourRate::from)).map(Some)
    }
}

impl SwitchFeed for Snapshot {
    fn get_switch_states(&self) -> Result<BTreeMap<String, bool>> {
        Ok(self
            .switches
            .iter()
            .filter_map(|(consumer, state)| Some((consumer.clone(), state.is_on()?)))
            .collect())
    }
}

/// Snapshot file that is re-read on every request, so that a pass always sees fresh prices.
pub struct SnapshotFile(PathBuf);

impl SnapshotFile {
    pub const fn new(path: PathBuf) -> Self {
        Self(path)
    }
}

impl PriceFeed for SnapshotFile {
    fn get_prices(&self, on: NaiveDate) -> Result<Option<PriceSeries>> {
        Snapshot::read_from(&self.0)?.get_prices(on)
    }
}

impl SwitchFeed for SnapshotFile {
    fn get_switch_states(&self) -> Result<BTreeMap<String, bool>> {
        Snapshot::read_from(&self.0)?.get_switch_states()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    #[test]
    fn test_parse() -> Result {
        let snapshot: Snapshot = serde_json::from_str(
            r#"{"date": "2026-10-19", "today": [0.25, "0.30", "unknown", null], "tomorrow": null}"#,
        )?;
        assert_eq!(snapshot.today, [Some(0.25), Some(0.30), None, None]);
        assert!(snapshot.tomorrow.is_none());
        Ok(())
    }

    #[test]
    fn test_tomorrow_is_optional() -> Result {
        let snapshot: Snapshot = serde_json::from_str(r#"{"date": "2026-10-19", "today": [1]}"#)?;
        assert!(snapshot.tomorrow.is_none());
        assert!(snapshot.switches.is_empty());
        Ok(())
    }

    #[test]
    fn test_switch_states() -> Result {
        let snapshot: Snapshot = serde_json::from_str(
            r#"{
                "date": "2026-10-19",
                "today": [1],
                "switches": {"dishwasher": "on", "heatpump": "off", "charger": "unavailable"}
            }"#,
        )?;
        let states = snapshot.get_switch_states()?;
        assert_eq!(states.len(), 2);
        assert!(states["dishwasher"]);
        assert!(!states["heatpump"]);
        Ok(())
    }

    #[test]
    fn test_upcoming_prices() -> Result {
        let snapshot = Snapshot {
            date: today(),
            today: vec![Some(0.2); 24],
            tomorrow: Some(vec![Some(0.3); 24]),
            switches: BTreeMap::new(),
        };
        let prices = snapshot.get_upcoming_prices(today())?.unwrap();
        assert_eq!(prices.len(), 48);
        Ok(())
    }

    #[test]
    fn test_unknown_tomorrow_is_skipped() -> Result {
        let mut tomorrow = vec![Some(0.3); 24];
        tomorrow[5] = None;
        let snapshot = Snapshot {
            date: today(),
            today: vec![Some(0.2); 24],
            tomorrow: Some(tomorrow),
            switches: BTreeMap::new(),
        };
        let prices = snapshot.get_upcoming_prices(today())?.unwrap();
        assert_eq!(prices.len(), 24);
        Ok(())
    }

    #[test]
    fn test_overlapping_tomorrow_is_skipped() -> Result {
        let snapshot = Snapshot {
            date: today(),
            today: vec![Some(0.2); 25],
            tomorrow: Some(vec![Some(0.3); 24]),
            switches: BTreeMap::new(),
        };
        let prices = snapshot.get_upcoming_prices(today())?.unwrap();
        assert_eq!(prices.len(), 25);
        Ok(())
    }

    #[test]
    fn test_unknown_today_is_unavailable() -> Result {
        let snapshot = Snapshot {
            date: today(),
            today: vec![None; 24],
            tomorrow: None,
            switches: BTreeMap::new(),
        };
        assert!(snapshot.get_upcoming_prices(today())?.is_none());
        Ok(())
    }

    #[test]
    fn test_stale_snapshot() -> Result {
        let snapshot = Snapshot {
            date: today(),
            today: vec![Some(0.2); 24],
            tomorrow: None,
            switches: BTreeMap::new(),
        };
        let later = today() + chrono::TimeDelta::days(3);
        assert!(snapshot.get_upcoming_prices(later)?.is_none());
        Ok(())
    }
}
