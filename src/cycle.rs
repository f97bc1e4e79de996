use std::{cell::RefCell, collections::BTreeMap};

use chrono::{NaiveDateTime, TimeDelta};

use crate::{
    api::{PriceFeed, SwitchFeed},
    clock::Clock,
    config::Settings,
    core::{
        acceptance::{AcceptanceLevel, AcceptancePolicy},
        actuator::{Actuator, ActuatorState},
        consumer::{Consumer, ConsumerState},
        interval::Interval,
        phase::PhaseLoad,
        scheduler::{Assignment, Plan, Scheduler},
        selector::{MergedInterval, available_intervals},
        signal::{Adjustment, ThrottleSignal, adjustments, throttle_signal},
        slot::ClassifiedSeries,
    },
    guard::ReentrancyGuard,
    prelude::*,
};

/// Everything one pass has found out.
#[must_use]
pub struct Outcome {
    pub now: NaiveDateTime,
    pub series: ClassifiedSeries,

    /// One per slot of the series.
    pub adjustments: Vec<Adjustment>,

    pub intervals: Vec<(AcceptanceLevel, Vec<MergedInterval>)>,

    /// Consumers whose runs were already underway are not in the plan.
    pub plan: Plan,

    /// [`None`] when the current time is not covered by the prices.
    pub signal: Option<ThrottleSignal>,

    /// Every consumer with a run, underway or freshly planned, ordered by name.
    pub switches: Vec<Switch>,
}

/// What the switch of a consumer is told at the time of the pass.
#[derive(Clone, Debug)]
pub struct Switch {
    pub consumer: String,
    pub interval: Interval,
    pub actuator: ActuatorState,
    pub state: ConsumerState,
}

/// Run of a consumer and the actuator of its switch, kept from one pass to the next.
#[derive(Clone, Debug)]
struct Control {
    assignment: Assignment,
    actuator: Actuator,
}

impl Control {
    const fn new(assignment: Assignment, confirmation_timeout: TimeDelta) -> Self {
        Self { assignment, actuator: Actuator::new(confirmation_timeout) }
    }

    /// The run has begun or is due, so it must not be moved anymore.
    fn is_committed(&self, now: NaiveDateTime) -> bool {
        self.assignment.interval.start <= now || self.actuator.state() != ActuatorState::Idle
    }

    /// The run no longer concerns the scheduler.
    ///
    /// A completed run is kept for the rest of its day, so the consumer is not started twice.
    /// A run that never started or failed is dropped once its interval is over, so it gets
    /// rescheduled.
    fn is_expired(&self, now: NaiveDateTime) -> bool {
        match self.actuator.state() {
            ActuatorState::Verified { .. } => self.assignment.interval.end.date() < now.date(),
            ActuatorState::Idle | ActuatorState::Failed { .. } => {
                self.assignment.interval.end <= now
            }
            ActuatorState::Starting { .. }
            | ActuatorState::Running { .. }
            | ActuatorState::Stopping { .. } => false,
        }
    }

    /// Whether the consumer may be drawing power.
    fn is_loading(&self) -> bool {
        !matches!(self.actuator.state(), ActuatorState::Verified { .. })
    }

    fn switch(&self) -> Switch {
        Switch {
            consumer: self.assignment.consumer.clone(),
            interval: self.assignment.interval,
            actuator: self.actuator.state(),
            state: self.actuator.consumer_state(),
        }
    }
}

pub struct Cycle<'a> {
    settings: &'a Settings,
    policy: AcceptancePolicy,
    feed: &'a dyn PriceFeed,
    switch_feed: &'a dyn SwitchFeed,
    clock: &'a dyn Clock,
    guard: ReentrancyGuard,

    /// By consumer name.
    controls: RefCell<BTreeMap<String, Control>>,
}

impl<'a> Cycle<'a> {
    pub fn try_new(
        settings: &'a Settings,
        feed: &'a dyn PriceFeed,
        switch_feed: &'a dyn SwitchFeed,
        clock: &'a dyn Clock,
    ) -> Result<Self> {
        let policy = settings.acceptance_policy().context("invalid acceptance levels")?;
        Ok(Self {
            settings,
            policy,
            feed,
            switch_feed,
            clock,
            guard: ReentrancyGuard::default(),
            controls: RefCell::default(),
        })
    }

    /// Run one pass: fetch, classify, select, schedule, compute the signal, and drive switches.
    ///
    /// Returns [`None`] when the prices are unavailable or another pass is in flight.
    #[instrument(skip_all, name = "Running the pass…")]
    pub fn run(&self) -> Result<Option<Outcome>> {
        let Some(_token) = self.guard.try_enter() else {
            warn!("Another pass is in progress, skipping");
            return Ok(None);
        };

        let now = self.clock.now();
        info!(%now, "Starting");

        let Some(prices) = self.feed.get_upcoming_prices(now.date())? else {
            warn!("No prices, skipping the pass");
            return Ok(None);
        };
        let classifier = self.settings.classification.classifier();
        let series = match classifier.classify_series(&prices) {
            Ok(series) => series,
            Err(error) => {
                warn!(%error, "No classification available, skipping the pass");
                return Ok(None);
            }
        };
        info!(state = %series.state_at(now), n_slots = series.len(), "Classified");

        let intervals = available_intervals(&series, &self.policy);
        for (level, intervals) in &intervals {
            if intervals.is_empty() {
                warn!(priority = level.priority, "No slot available");
            }
        }

        let mut controls = self.controls.borrow_mut();
        controls.retain(|consumer, control| {
            let is_expired = control.is_expired(now);
            if is_expired {
                debug!(%consumer, actuator = ?control.actuator.state(), "Forgetting the run");
            }
            !is_expired
        });

        // Runs that are underway keep their interval, everything else is planned anew.
        controls.retain(|_, control| control.is_committed(now));
        let mut committed = PhaseLoad::default();
        for control in controls.values().filter(|control| control.is_loading()) {
            committed.commit(control.assignment.phases, control.assignment.average_power);
        }
        let pending = self
            .settings
            .consumers
            .iter()
            .filter(|consumer| !controls.contains_key(&consumer.name))
            .cloned()
            .collect::<Vec<Consumer>>();

        let plan = Scheduler::builder()
            .consumers(&pending)
            .series(&series)
            .policy(&self.policy)
            .ceilings(self.settings.power)
            .duration_estimate(self.settings.duration)
            .committed(committed)
            .since(now)
            .schedule();

        let adjustments =
            adjustments(&series, self.settings.signal.source, classifier.num_classes());
        let signal =
            throttle_signal(&series, &adjustments, now, self.settings.signal.transition_window());
        match &signal {
            Some(signal) => info!(value = %signal.value, "Throttle signal"),
            None => warn!("The current time is not covered by the prices"),
        }

        let confirmation_timeout = self.settings.actuator.confirmation_timeout;
        for assignment in &plan.assignments {
            controls.insert(
                assignment.consumer.clone(),
                Control::new(assignment.clone(), confirmation_timeout),
            );
        }
        let switch_states = self.switch_feed.get_switch_states()?;
        for (consumer, control) in controls.iter_mut() {
            if let Some(is_on) = switch_states.get(consumer) {
                control.actuator.observe(*is_on, now)?;
            }
            let state = control.actuator.drive(control.assignment.interval, now)?;
            debug!(%consumer, actuator = ?state, "Driven");
        }
        let switches = controls.values().map(Control::switch).collect();

        Ok(Some(Outcome { now, series, adjustments, intervals, plan, signal, switches }))
    }
}
