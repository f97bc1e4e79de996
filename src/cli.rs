use std::{num::NonZeroU8, path::PathBuf};

use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};

use crate::{
    clock::{Clock, FixedClock, SystemClock},
    config::Settings,
    core::{classifier::BinningPolicy, signal::AdjustmentSource},
};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
pub struct Args {
    /// Settings file: classification, acceptance levels, power ceilings, and consumers.
    #[clap(long, env = "LOADSHIFT_CONFIG", default_value = "loadshift.toml", global = true)]
    pub config: PathBuf,

    /// Price snapshot with today's and, optionally, tomorrow's hourly prices.
    #[clap(long, env = "LOADSHIFT_PRICES", default_value = "prices.json", global = true)]
    pub prices: PathBuf,

    /// Pretend that the local time is this, for example `2026-10-19T13:30:00`.
    #[clap(long, env = "LOADSHIFT_NOW", global = true)]
    pub now: Option<NaiveDateTime>,

    /// Print JSON host state instead of tables.
    #[clap(long, global = true)]
    pub json: bool,

    #[clap(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    pub fn clock(&self) -> Box<dyn Clock> {
        match self.now {
            Some(now) => Box::new(FixedClock(now)),
            None => Box::new(SystemClock),
        }
    }
}

/// Command-line overrides of the settings file.
#[derive(Copy, Clone, Parser)]
pub struct Overrides {
    /// Number of price classes.
    #[clap(long, env = "LOADSHIFT_NUM_CLASSES", global = true)]
    pub num_classes: Option<NonZeroU8>,

    #[clap(long, env = "LOADSHIFT_POLICY", global = true)]
    pub policy: Option<BinningPolicy>,

    /// What the throttle signal is derived from.
    #[clap(long, env = "LOADSHIFT_SIGNAL_SOURCE", global = true)]
    pub signal_source: Option<AdjustmentSource>,
}

impl Overrides {
    pub fn apply(self, settings: &mut Settings) {
        if let Some(num_classes) = self.num_classes {
            settings.classification.num_classes = num_classes;
        }
        if let Some(policy) = self.policy {
            settings.classification.policy = policy;
        }
        if let Some(source) = self.signal_source {
            settings.signal.source = source;
        }
    }
}

#[derive(Copy, Clone, Subcommand)]
pub enum Command {
    /// Classify the hourly prices.
    #[clap(name = "classify")]
    Classify,

    /// Show the acceptable intervals per priority.
    #[clap(name = "slots")]
    Slots,

    /// Schedule the consumers.
    #[clap(name = "schedule")]
    Schedule,

    /// Show the current throttle signal.
    #[clap(name = "signal")]
    Signal,

    /// Run the full pass and show everything.
    #[clap(name = "run")]
    Run,

    /// Keep running passes, driving the consumer switches between them.
    #[clap(name = "watch")]
    Watch {
        /// Pause between the passes.
        #[clap(long, env = "LOADSHIFT_INTERVAL_SECONDS", default_value = "60")]
        interval_seconds: u64,
    },
}
