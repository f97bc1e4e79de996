use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::{core::series::PriceSeries, prelude::*};

/// Source of day-ahead prices.
pub trait PriceFeed {
    /// Hourly prices of the day, [`None`] if they are not (fully) published.
    fn get_prices(&self, on: NaiveDate) -> Result<Option<PriceSeries>>;

    /// Today's prices followed by tomorrow's when those are available.
    ///
    /// Returns [`None`] if today's prices are unavailable.
    #[instrument(skip_all, fields(today = %today))]
    fn get_upcoming_prices(&self, today: NaiveDate) -> Result<Option<PriceSeries>> {
        let Some(mut prices) = self.get_prices(today)? else {
            warn!("Today's prices are unavailable");
            return Ok(None);
        };
        match today.succ_opt() {
            Some(tomorrow) => match self.get_prices(tomorrow)? {
                Some(next_prices) => {
                    if let Err(error) = prices.try_extend(next_prices) {
                        warn!(%error, "Tomorrow's prices do not follow today's, ignoring them");
                    }
                }
                None => info!("Tomorrow's prices are not published yet"),
            },
            None => warn!("There is no tomorrow"),
        }
        info!(n_prices = prices.len(), "Fetched");
        Ok(Some(prices))
    }
}

/// Source of the on/off states the host reports for the consumer switches.
pub trait SwitchFeed {
    /// Consumers whose switch state is unknown are left out.
    fn get_switch_states(&self) -> Result<BTreeMap<String, bool>>;
}
