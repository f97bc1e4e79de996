use std::num::NonZeroU8;

use itertools::{Itertools, MinMaxResult};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::core::{
    class::PriceClass,
    series::PriceSeries,
    slot::ClassifiedSeries,
    stats::{percentile, sorted},
};

pub const DEFAULT_NUM_CLASSES: NonZeroU8 = NonZeroU8::MIN.saturating_add(6);

/// Added to the maximum price so that the most expensive hour falls inside the last bin.
pub const DEFAULT_EPSILON: f64 = 0.01;

#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum InsufficientData {
    #[error("there are no prices to classify")]
    Empty,

    #[error("price #{0} is not a finite number")]
    NonFinite(usize),
}

#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum BinningPolicy {
    /// Equal-width bins between the cheapest and the most expensive price.
    #[default]
    EqualWidth,

    /// Bins holding roughly the same number of prices each.
    Quantile,
}

#[derive(Copy, Clone, Debug, bon::Builder)]
pub struct Classifier {
    #[builder(default = DEFAULT_NUM_CLASSES)]
    num_classes: NonZeroU8,

    #[builder(default)]
    policy: BinningPolicy,

    #[builder(default = DEFAULT_EPSILON)]
    epsilon: f64,
}

impl Classifier {
    #[must_use]
    pub const fn num_classes(&self) -> NonZeroU8 {
        self.num_classes
    }

    /// Assign a class to every price, `output[i]` being the class of `prices[i]`.
    pub fn classify(&self, prices: &[f64]) -> Result<Vec<PriceClass>, InsufficientData> {
        if let Some(index) = prices.iter().position(|price| !price.is_finite()) {
            return Err(InsufficientData::NonFinite(index));
        }
        let (min, max) = match prices.iter().copied().map(OrderedFloat).minmax() {
            MinMaxResult::NoElements => return Err(InsufficientData::Empty),
            MinMaxResult::OneElement(price) => (price.0, price.0),
            MinMaxResult::MinMax(min, max) => (min.0, max.0),
        };
        if min == max {
            return Ok(vec![PriceClass::CHEAPEST; prices.len()]);
        }
        Ok(match self.policy {
            BinningPolicy::EqualWidth => self.classify_equal_width(prices, min, max),
            BinningPolicy::Quantile => self.classify_quantile(prices),
        })
    }

    pub fn classify_series(
        &self,
        series: &PriceSeries,
    ) -> Result<ClassifiedSeries, InsufficientData> {
        let classes = self.classify(&series.raw_rates())?;
        Ok(ClassifiedSeries::new(series, classes))
    }

    #[expect(clippy::cast_possible_truncation)]
    #[expect(clippy::cast_sign_loss)]
    fn classify_equal_width(&self, prices: &[f64], min: f64, max: f64) -> Vec<PriceClass> {
        let num_classes = f64::from(self.num_classes.get());
        let bin_width = (max + self.epsilon - min) / num_classes;
        prices
            .iter()
            .map(|price| {
                let rank = ((price - min) / bin_width).ceil().clamp(1.0, num_classes);
                PriceClass::clamped(rank as u8, self.num_classes)
            })
            .collect()
    }

    fn classify_quantile(&self, prices: &[f64]) -> Vec<PriceClass> {
        let sorted = sorted(prices);
        let num_classes = self.num_classes.get();
        let thresholds = (1..=num_classes)
            .filter_map(|k| percentile(&sorted, f64::from(k) / f64::from(num_classes)))
            .collect_vec();
        prices
            .iter()
            .map(|price| {
                let rank = thresholds
                    .iter()
                    .position(|threshold| price <= threshold)
                    .map_or(num_classes, |index| u8::try_from(index + 1).unwrap_or(num_classes));
                PriceClass::clamped(rank, self.num_classes)
            })
            .collect()
    }
}
