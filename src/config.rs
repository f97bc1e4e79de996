use std::{collections::HashSet, num::NonZeroU8, path::Path};

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use serde_with::{DurationSeconds, serde_as};

use crate::{
    core::{
        acceptance::{AcceptanceLevel, AcceptancePolicy},
        classifier::{BinningPolicy, Classifier, DEFAULT_EPSILON, DEFAULT_NUM_CLASSES},
        consumer::Consumer,
        duration::DurationEstimate,
        scheduler::Ceilings,
        signal::{AdjustmentSource, DEFAULT_TRANSITION_WINDOW_MINUTES, window_from_minutes},
    },
    prelude::*,
};

/// Settings file contents. Every section may be omitted.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub classification: ClassificationSettings,
    pub signal: SignalSettings,
    pub power: Ceilings,
    pub duration: DurationEstimate,
    pub actuator: ActuatorSettings,

    pub acceptance: Vec<AcceptanceLevel>,

    pub consumers: Vec<Consumer>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            classification: ClassificationSettings::default(),
            signal: SignalSettings::default(),
            power: Ceilings::default(),
            duration: DurationEstimate::default(),
            actuator: ActuatorSettings::default(),
            acceptance: AcceptancePolicy::default_levels(),
            consumers: Vec::new(),
        }
    }
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClassificationSettings {
    pub num_classes: NonZeroU8,
    pub policy: BinningPolicy,
    pub epsilon: f64,
}

impl Default for ClassificationSettings {
    fn default() -> Self {
        Self {
            num_classes: DEFAULT_NUM_CLASSES,
            policy: BinningPolicy::default(),
            epsilon: DEFAULT_EPSILON,
        }
    }
}

impl ClassificationSettings {
    pub fn classifier(&self) -> Classifier {
        Classifier::builder()
            .num_classes(self.num_classes)
            .policy(self.policy)
            .epsilon(self.epsilon)
            .build()
    }
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SignalSettings {
    /// Half-width of the ramp around an hour boundary.
    pub transition_window_minutes: f64,

    pub source: AdjustmentSource,
}

impl Default for SignalSettings {
    fn default() -> Self {
        Self {
            transition_window_minutes: DEFAULT_TRANSITION_WINDOW_MINUTES,
            source: AdjustmentSource::default(),
        }
    }
}

impl SignalSettings {
    #[must_use]
    pub fn transition_window(&self) -> TimeDelta {
        window_from_minutes(self.transition_window_minutes)
    }
}

#[serde_as]
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ActuatorSettings {
    /// How long to wait for a switch to confirm a command.
    #[serde_as(as = "DurationSeconds<i64>")]
    #[serde(rename = "confirmation_timeout_seconds")]
    pub confirmation_timeout: TimeDelta,
}

impl Default for ActuatorSettings {
    fn default() -> Self {
        Self { confirmation_timeout: TimeDelta::minutes(1) }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, derive_more::Display)]
#[display("`{field}` {message}")]
pub struct ConfigProblem {
    pub field: String,
    pub message: String,
}

impl ConfigProblem {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into() }
    }
}

impl Settings {
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn read_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!("The settings file does not exist, using defaults");
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read `{}`", path.display()))?;
        let settings = Self::from_toml_str(&contents)
            .with_context(|| format!("failed to load `{}`", path.display()))?;
        info!(n_consumers = settings.consumers.len(), "Loaded");
        Ok(settings)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let settings: Self = toml::from_str(contents)?;
        let problems = settings.validate();
        ensure!(
            problems.is_empty(),
            "invalid settings: {}",
            problems.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "),
        );
        Ok(settings)
    }

    /// Find every fatal problem.
    ///
    /// Consumers with bad ranges are only warned about, the scheduler skips them.
    #[must_use]
    pub fn validate(&self) -> Vec<ConfigProblem> {
        let mut problems = Vec::new();

        let epsilon = self.classification.epsilon;
        if !epsilon.is_finite() || epsilon < 0.0 {
            problems.push(ConfigProblem::new("classification.epsilon", "must be non-negative"));
        }

        let window = self.signal.transition_window_minutes;
        if !window.is_finite() || !(0.0..=30.0).contains(&window) {
            problems.push(ConfigProblem::new(
                "signal.transition_window_minutes",
                "must be between 0 and 30",
            ));
        }

        if !self.power.global.is_finite() || self.power.global.0 <= 0.0 {
            problems.push(ConfigProblem::new("power.global_ceiling_watts", "must be positive"));
        }
        if !self.power.phase.is_finite() || self.power.phase.0 <= 0.0 {
            problems.push(ConfigProblem::new("power.phase_ceiling_watts", "must be positive"));
        }

        if self.actuator.confirmation_timeout <= TimeDelta::zero() {
            problems.push(ConfigProblem::new(
                "actuator.confirmation_timeout_seconds",
                "must be positive",
            ));
        }

        if let Err(error) = self.acceptance_policy() {
            problems.push(ConfigProblem::new("acceptance", error.to_string()));
        }

        let mut names = HashSet::new();
        for consumer in &self.consumers {
            if !names.insert(consumer.name.as_str()) {
                problems.push(ConfigProblem::new(
                    "consumers",
                    format!("`{}` is defined more than once", consumer.name),
                ));
            }
            if let Some(problem) = consumer.configuration_problem() {
                warn!(consumer = %consumer.name, problem, "The consumer will not be scheduled");
            }
        }

        problems
    }

    pub fn acceptance_policy(&self) -> Result<AcceptancePolicy> {
        AcceptancePolicy::try_new(self.acceptance.clone())
    }
}
