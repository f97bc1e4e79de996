use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::{
    core::{
        acceptance::Priority,
        actuator::ActuatorState,
        consumer::ConsumerState,
        selector::MergedInterval,
        signal::ThrottleSignal,
    },
    cycle::Outcome,
};

/// Classification as the host shows it: the current class and one attribute per slot.
#[derive(Serialize)]
pub struct ClassificationState {
    pub state: String,
    pub attributes: BTreeMap<String, String>,
}

#[derive(Serialize)]
pub struct PriorityIntervals {
    pub priority: Priority,
    pub max_class: u8,
    pub intervals: Vec<MergedInterval>,
}

#[derive(Serialize)]
pub struct ConsumerSchedule {
    pub consumer: String,
    pub state: ConsumerState,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<NaiveDateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub switch: Option<ActuatorState>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Serialize)]
pub struct Report {
    pub now: NaiveDateTime,
    pub classification: ClassificationState,
    pub intervals: Vec<PriorityIntervals>,
    pub schedule: Vec<ConsumerSchedule>,
    pub signal: Option<ThrottleSignal>,
}

impl From<&Outcome> for Report {
    fn from(outcome: &Outcome) -> Self {
        let classification = ClassificationState {
            state: outcome.series.state_at(outcome.now),
            attributes: outcome.series.attributes(),
        };
        let intervals = outcome
            .intervals
            .iter()
            .map(|(level, intervals)| PriorityIntervals {
                priority: level.priority,
                max_class: level.max_class,
                intervals: intervals.clone(),
            })
            .collect();
        let switched = outcome.switches.iter().map(|switch| ConsumerSchedule {
            consumer: switch.consumer.clone(),
            state: switch.state,
            start: Some(switch.interval.start),
            end: Some(switch.interval.end),
            switch: Some(switch.actuator),
            reason: None,
        });
        let skipped = outcome.plan.skipped.iter().map(|skipped| ConsumerSchedule {
            consumer: skipped.consumer.clone(),
            state: ConsumerState::Unscheduled,
            start: None,
            end: None,
            switch: None,
            reason: Some(skipped.reason.to_string()),
        });
        Self {
            now: outcome.now,
            classification,
            intervals,
            schedule: switched.chain(skipped).collect(),
            signal: outcome.signal,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::{
        api::Snapshot,
        clock::FixedClock,
        config::Settings,
        cycle::Cycle,
        prelude::*,
    };

    #[test]
    fn test_report() -> Result {
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let feed = Snapshot {
            date: today,
            today: (0..24).map(|hour| Some(f64::from(hour))).collect(),
            tomorrow: None,
            switches: BTreeMap::new(),
        };
        let settings = Settings::from_toml_str(
            r#"
                [[consumers]]
                name = "heatpump"
                priority = 2
                phases = [1]
                duration_hours = { min = 1.0, max = 3.0 }
                power_watts = { min = 500.0, max = 20000.0 }

                [[consumers]]
                name = "dishwasher"
                priority = 5
                phases = [2]
                duration_hours = { min = 2.0, max = 4.0 }
                power_watts = { min = 1000.0, max = 3000.0 }
            "#,
        )?;
        let clock = FixedClock(today.and_hms_opt(0, 15, 0).unwrap());
        let outcome = Cycle::try_new(&settings, &feed, &feed, &clock)?.run()?.unwrap();
        let report = Report::from(&outcome);

        assert_eq!(report.classification.state, "Class 1");
        assert_eq!(report.classification.attributes["2026-10-19 23:00-00:00"], "Class 7");
        assert_eq!(report.schedule.len(), 2);
        assert_eq!(report.schedule[0].state, ConsumerState::Scheduled);
        assert_eq!(report.schedule[1].state, ConsumerState::Unscheduled);

        let json = serde_json::to_value(&report)?;
        assert_eq!(json["schedule"][0]["consumer"], "dishwasher");
        assert_eq!(json["schedule"][0]["start"], "2026-10-19T01:00:00");
        assert_eq!(json["schedule"][0]["switch"]["state"], "idle");
        assert_eq!(json["schedule"][1]["consumer"], "heatpump");
        assert!(json["schedule"][1].get("start").is_none());
        Ok(())
    }
}
