use std::cmp::Reverse;

use bon::Builder;
use chrono::NaiveDateTime;
use enumset::EnumSet;
use serde::{Deserialize, Serialize};

use crate::{
    core::{
        acceptance::{AcceptancePolicy, Priority},
        class::PriceClass,
        consumer::Consumer,
        duration::DurationEstimate,
        interval::Interval,
        phase::{Phase, PhaseLoad},
        selector::select_slots,
        slot::ClassifiedSeries,
    },
    prelude::*,
    quantity::{Quantity, energy::WattHours, power::Watts, time::Hours},
};

pub const DEFAULT_CEILING: Watts = Quantity(11000.0);

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Ceilings {
    /// No consumer may draw more than this at its maximum.
    #[serde(rename = "global_ceiling_watts", default = "default_ceiling")]
    pub global: Watts,

    /// Per-phase budget, divided by the number of phases a consumer is spread over.
    #[serde(rename = "phase_ceiling_watts", default = "default_ceiling")]
    pub phase: Watts,
}

const fn default_ceiling() -> Watts {
    DEFAULT_CEILING
}

impl Default for Ceilings {
    fn default() -> Self {
        Self { global: DEFAULT_CEILING, phase: DEFAULT_CEILING }
    }
}

#[derive(Clone, Debug, PartialEq, derive_more::Display)]
pub enum SkipReason {
    #[display("configuration invalid: {_0}")]
    ConfigurationInvalid(&'static str),

    #[display("capacity exceeded: maximum power {max_power} is above the global ceiling {ceiling}")]
    GlobalCeilingExceeded { max_power: Watts, ceiling: Watts },

    #[display("capacity exceeded: {phase} would carry {load} with the limit of {limit}")]
    PhaseCeilingExceeded { phase: Phase, load: Watts, limit: Watts },

    #[display("no acceptable slot starts at or after {after}")]
    NoSlotAvailable { after: NaiveDateTime },
}

impl SkipReason {
    #[must_use]
    pub const fn is_capacity_exceeded(&self) -> bool {
        matches!(self, Self::GlobalCeilingExceeded { .. } | Self::PhaseCeilingExceeded { .. })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Assignment {
    pub consumer: String,
    pub priority: Priority,
    pub interval: Interval,
    pub duration: Hours,
    pub average_power: Watts,
    pub energy: WattHours,
    pub phases: EnumSet<Phase>,
    pub class: PriceClass,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Skipped {
    pub consumer: String,
    pub priority: Priority,
    pub reason: SkipReason,
}

#[derive(Clone, Debug, Default, PartialEq)]
#[must_use]
pub struct Plan {
    /// In the order of processing, that is by descending priority.
    pub assignments: Vec<Assignment>,

    pub skipped: Vec<Skipped>,

    /// Total committed per phase at the end of the pass.
    pub phase_load: PhaseLoad,
}

impl Plan {
    #[must_use]
    pub fn assignment(&self, consumer: &str) -> Option<&Assignment> {
        self.assignments.iter().find(|assignment| assignment.consumer == consumer)
    }
}

#[derive(Builder)]
#[builder(finish_fn(vis = ""))]
pub struct Scheduler<'a> {
    consumers: &'a [Consumer],
    series: &'a ClassifiedSeries,
    policy: &'a AcceptancePolicy,

    #[builder(default)]
    ceilings: Ceilings,

    #[builder(default)]
    duration_estimate: DurationEstimate,

    /// Load of the runs that are already underway.
    #[builder(default)]
    committed: PhaseLoad,

    /// Nothing starts before this time.
    since: NaiveDateTime,
}

impl<S: scheduler_builder::IsComplete> SchedulerBuilder<'_, S> {
    pub fn schedule(self) -> Plan {
        self.build().schedule()
    }
}

impl Scheduler<'_> {
    /// Assign start times greedily, the most urgent consumers first.
    #[instrument(skip_all, name = "Scheduling…", fields(since = %self.since))]
    fn schedule(self) -> Plan {
        let mut consumers = self.consumers.iter().collect::<Vec<_>>();
        consumers.sort_by_key(|consumer| Reverse(consumer.priority));

        let mut plan = Plan { phase_load: self.committed, ..Plan::default() };
        let mut cursor = self.since;

        for consumer in consumers {
            match self.try_assign(consumer, &plan.phase_load, cursor) {
                Ok(assignment) => {
                    info!(
                        consumer = %consumer.name,
                        start = %assignment.interval.start,
                        end = %assignment.interval.end,
                        "Scheduled"
                    );
                    plan.phase_load.commit(assignment.phases, assignment.average_power);
                    cursor = cursor.max(assignment.interval.end);
                    plan.assignments.push(assignment);
                }
                Err(reason) => {
                    warn!(consumer = %consumer.name, %reason, "Not scheduled");
                    plan.skipped.push(Skipped {
                        consumer: consumer.name.clone(),
                        priority: consumer.priority,
                        reason,
                    });
                }
            }
        }
        plan
    }

    fn try_assign(
        &self,
        consumer: &Consumer,
        phase_load: &PhaseLoad,
        cursor: NaiveDateTime,
    ) -> Result<Assignment, SkipReason> {
        if let Some(problem) = consumer.configuration_problem() {
            return Err(SkipReason::ConfigurationInvalid(problem));
        }
        if consumer.power.max > self.ceilings.global {
            return Err(SkipReason::GlobalCeilingExceeded {
                max_power: consumer.power.max,
                ceiling: self.ceilings.global,
            });
        }

        let average_power = consumer.average_power();
        #[expect(clippy::cast_precision_loss)]
        let limit = self.ceilings.phase / consumer.phases.len() as f64;
        if let Some(phase) = phase_load.overloaded_phase(consumer.phases, average_power, limit) {
            return Err(SkipReason::PhaseCeilingExceeded {
                phase,
                load: phase_load.get(phase) + average_power,
                limit,
            });
        }

        let duration = self.duration_estimate.estimate(consumer.duration);
        let slot = select_slots(self.series, self.policy, consumer.priority)
            .into_iter()
            .find(|slot| slot.interval.start >= cursor)
            .ok_or(SkipReason::NoSlotAvailable { after: cursor })?;
        debug!(consumer = %consumer.name, %duration, class = %slot.class, "Found a slot");
        let end = duration
            .to_time_delta()
            .and_then(|delta| slot.interval.start.checked_add_signed(delta))
            .ok_or(SkipReason::ConfigurationInvalid("duration does not fit the calendar"))?;

        Ok(Assignment {
            consumer: consumer.name.clone(),
            priority: consumer.priority,
            interval: Interval::new(slot.interval.start, end),
            duration,
            average_power,
            energy: average_power * duration,
            phases: consumer.phases,
            class: slot.class,
        })
    }
}
