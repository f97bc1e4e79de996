use chrono::{NaiveDateTime, TimeDelta};
use serde::Serialize;

use crate::{
    core::{consumer::ConsumerState, interval::Interval},
    prelude::*,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum Failure {
    #[display("the switch did not confirm turning on")]
    StartNotConfirmed,

    #[display("the switch did not confirm turning off")]
    StopNotConfirmed,

    #[display("the switch reported the opposite state")]
    UnexpectedConfirmation,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ActuatorState {
    Idle,
    Starting { since: NaiveDateTime },
    Running { since: NaiveDateTime },
    Stopping { since: NaiveDateTime },
    Verified { at: NaiveDateTime },
    Failed { at: NaiveDateTime, failure: Failure },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ActuatorEvent {
    StartRequested { at: NaiveDateTime },
    StopRequested { at: NaiveDateTime },

    /// The switch reported its state.
    Confirmed { is_on: bool, at: NaiveDateTime },

    Tick { now: NaiveDateTime },
}

/// Switch controller that never blocks: every command waits for a confirmation event,
/// and a missing confirmation is detected by a later tick.
#[derive(Clone, Debug)]
pub struct Actuator {
    state: ActuatorState,
    confirmation_timeout: TimeDelta,
}

impl Actuator {
    #[must_use]
    pub const fn new(confirmation_timeout: TimeDelta) -> Self {
        Self { state: ActuatorState::Idle, confirmation_timeout }
    }

    #[must_use]
    pub const fn state(&self) -> ActuatorState {
        self.state
    }

    /// Apply the event, invalid transitions are rejected and leave the state intact.
    pub fn handle(&mut self, event: ActuatorEvent) -> Result<ActuatorState> {
        let next = match (self.state, event) {
            (
                ActuatorState::Idle | ActuatorState::Verified { .. } | ActuatorState::Failed { .. },
                ActuatorEvent::StartRequested { at },
            ) => ActuatorState::Starting { since: at },

            (ActuatorState::Starting { .. }, ActuatorEvent::Confirmed { is_on: true, at }) => {
                ActuatorState::Running { since: at }
            }
            (ActuatorState::Stopping { .. }, ActuatorEvent::Confirmed { is_on: false, at }) => {
                ActuatorState::Verified { at }
            }
            (
                ActuatorState::Starting { .. } | ActuatorState::Stopping { .. },
                ActuatorEvent::Confirmed { at, .. },
            ) => ActuatorState::Failed { at, failure: Failure::UnexpectedConfirmation },

            (ActuatorState::Running { .. }, ActuatorEvent::StopRequested { at }) => {
                ActuatorState::Stopping { since: at }
            }

            (ActuatorState::Starting { since }, ActuatorEvent::Tick { now })
                if now - since >= self.confirmation_timeout =>
            {
                ActuatorState::Failed { at: now, failure: Failure::StartNotConfirmed }
            }
            (ActuatorState::Stopping { since }, ActuatorEvent::Tick { now })
                if now - since >= self.confirmation_timeout =>
            {
                ActuatorState::Failed { at: now, failure: Failure::StopNotConfirmed }
            }
            (state, ActuatorEvent::Tick { .. }) => state,

            (state, event) => bail!("cannot handle `{event:?}` while in `{state:?}`"),
        };
        if next != self.state {
            debug!(from = ?self.state, to = ?next, "Transition");
            if let ActuatorState::Failed { failure, .. } = next {
                warn!(%failure, "Actuator failed");
            }
        }
        self.state = next;
        Ok(next)
    }

    /// Issue the command the scheduled interval demands at the time, or just tick.
    ///
    /// A failed start is retried as long as the interval lasts.
    pub fn drive(&mut self, interval: Interval, now: NaiveDateTime) -> Result<ActuatorState> {
        let should_run = interval.contains(now);
        let event = match self.state {
            ActuatorState::Idle | ActuatorState::Verified { .. } | ActuatorState::Failed { .. }
                if should_run =>
            {
                ActuatorEvent::StartRequested { at: now }
            }
            ActuatorState::Running { .. } if !should_run => ActuatorEvent::StopRequested { at: now },
            _ => ActuatorEvent::Tick { now },
        };
        self.handle(event)
    }

    /// Take the state the switch reports into account.
    ///
    /// Only a report that confirms the pending command is an event. Anything else is left to the
    /// confirmation timeout, since the switch may not have reacted yet.
    pub fn observe(&mut self, is_on: bool, at: NaiveDateTime) -> Result<ActuatorState> {
        match (self.state, is_on) {
            (ActuatorState::Starting { .. }, true) | (ActuatorState::Stopping { .. }, false) => {
                self.handle(ActuatorEvent::Confirmed { is_on, at })
            }
            _ => Ok(self.state),
        }
    }

    /// What the actuator tells about the consumer it drives.
    ///
    /// The consumer runs only once the switch has confirmed turning on.
    #[must_use]
    pub const fn consumer_state(&self) -> ConsumerState {
        match self.state {
            ActuatorState::Idle | ActuatorState::Starting { .. } | ActuatorState::Failed { .. } => {
                ConsumerState::Scheduled
            }
            ActuatorState::Running { .. } | ActuatorState::Stopping { .. } => ConsumerState::Running,
            ActuatorState::Verified { .. } => ConsumerState::Completed,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn at(minute: u32, second: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap().and_hms_opt(10, minute, second).unwrap()
    }

    fn actuator() -> Actuator {
        Actuator::new(TimeDelta::seconds(30))
    }

    #[test]
    fn test_full_cycle() -> Result {
        let mut actuator = actuator();
        actuator.handle(ActuatorEvent::StartRequested { at: at(0, 0) })?;
        assert_eq!(actuator.consumer_state(), ConsumerState::Scheduled);
        actuator.handle(ActuatorEvent::Tick { now: at(0, 10) })?;
        actuator.handle(ActuatorEvent::Confirmed { is_on: true, at: at(0, 12) })?;
        assert_eq!(actuator.state(), ActuatorState::Running { since: at(0, 12) });
        assert_eq!(actuator.consumer_state(), ConsumerState::Running);
        actuator.handle(ActuatorEvent::StopRequested { at: at(30, 0) })?;
        let state = actuator.handle(ActuatorEvent::Confirmed { is_on: false, at: at(30, 5) })?;
        assert_eq!(state, ActuatorState::Verified { at: at(30, 5) });
        assert_eq!(actuator.consumer_state(), ConsumerState::Completed);
        Ok(())
    }

    #[test]
    fn test_start_timeout() -> Result {
        let mut actuator = actuator();
        actuator.handle(ActuatorEvent::StartRequested { at: at(0, 0) })?;
        actuator.handle(ActuatorEvent::Tick { now: at(0, 29) })?;
        assert_eq!(actuator.state(), ActuatorState::Starting { since: at(0, 0) });
        let state = actuator.handle(ActuatorEvent::Tick { now: at(0, 30) })?;
        assert_eq!(
            state,
            ActuatorState::Failed { at: at(0, 30), failure: Failure::StartNotConfirmed },
        );
        Ok(())
    }

    #[test]
    fn test_stop_timeout() -> Result {
        let mut actuator = actuator();
        actuator.handle(ActuatorEvent::StartRequested { at: at(0, 0) })?;
        actuator.handle(ActuatorEvent::Confirmed { is_on: true, at: at(0, 1) })?;
        actuator.handle(ActuatorEvent::StopRequested { at: at(10, 0) })?;
        let state = actuator.handle(ActuatorEvent::Tick { now: at(11, 0) })?;
        assert!(matches!(state, ActuatorState::Failed { failure: Failure::StopNotConfirmed, .. }));
        Ok(())
    }

    #[test]
    fn test_unexpected_confirmation() -> Result {
        let mut actuator = actuator();
        actuator.handle(ActuatorEvent::StartRequested { at: at(0, 0) })?;
        let state = actuator.handle(ActuatorEvent::Confirmed { is_on: false, at: at(0, 1) })?;
        assert!(matches!(
            state,
            ActuatorState::Failed { failure: Failure::UnexpectedConfirmation, .. },
        ));
        Ok(())
    }

    #[test]
    fn test_invalid_transition_keeps_state() {
        let mut actuator = actuator();
        assert!(actuator.handle(ActuatorEvent::StopRequested { at: at(0, 0) }).is_err());
        assert!(actuator.handle(ActuatorEvent::Confirmed { is_on: true, at: at(0, 0) }).is_err());
        assert_eq!(actuator.state(), ActuatorState::Idle);
    }

    #[test]
    fn test_drive() -> Result {
        use ActuatorState::{Idle, Running, Starting, Stopping, Verified};

        let interval = Interval::new(at(10, 0), at(40, 0));
        let mut actuator = actuator();
        assert_eq!(actuator.drive(interval, at(5, 0))?, Idle);
        assert_eq!(actuator.drive(interval, at(10, 0))?, Starting { since: at(10, 0) });
        actuator.handle(ActuatorEvent::Confirmed { is_on: true, at: at(10, 2) })?;
        assert_eq!(actuator.drive(interval, at(20, 0))?, Running { since: at(10, 2) });
        assert_eq!(actuator.drive(interval, at(40, 0))?, Stopping { since: at(40, 0) });
        actuator.handle(ActuatorEvent::Confirmed { is_on: false, at: at(40, 1) })?;
        assert_eq!(actuator.drive(interval, at(45, 0))?, Verified { at: at(40, 1) });
        Ok(())
    }

    #[test]
    fn test_observe() -> Result {
        let mut actuator = actuator();
        assert_eq!(actuator.observe(true, at(0, 0))?, ActuatorState::Idle);
        actuator.handle(ActuatorEvent::StartRequested { at: at(0, 0) })?;
        assert_eq!(actuator.observe(false, at(0, 1))?, ActuatorState::Starting { since: at(0, 0) });
        assert_eq!(actuator.observe(true, at(0, 2))?, ActuatorState::Running { since: at(0, 2) });
        assert_eq!(actuator.observe(false, at(5, 0))?, ActuatorState::Running { since: at(0, 2) });
        actuator.handle(ActuatorEvent::StopRequested { at: at(10, 0) })?;
        assert_eq!(actuator.observe(false, at(10, 1))?, ActuatorState::Verified { at: at(10, 1) });
        Ok(())
    }

    #[test]
    fn test_restart_after_failure() -> Result {
        let mut actuator = actuator();
        actuator.handle(ActuatorEvent::StartRequested { at: at(0, 0) })?;
        actuator.handle(ActuatorEvent::Tick { now: at(5, 0) })?;
        let state = actuator.handle(ActuatorEvent::StartRequested { at: at(6, 0) })?;
        assert_eq!(state, ActuatorState::Starting { since: at(6, 0) });
        Ok(())
    }
}
