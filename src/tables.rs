use std::num::NonZeroU8;

use chrono::NaiveDateTime;
use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};
use enumset::EnumSet;
use itertools::Itertools;

use crate::{
    core::{
        acceptance::AcceptanceLevel,
        actuator::ActuatorState,
        class::PriceClass,
        consumer::ConsumerState,
        phase::Phase,
        scheduler::Plan,
        selector::MergedInterval,
        signal::Adjustment,
        slot::ClassifiedSeries,
    },
    cycle::Switch,
};

fn new_table() -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED).apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table.enforce_styling();
    table
}

/// Green for the cheapest third of the classes, red for the most expensive one.
fn class_color(class: PriceClass, num_classes: NonZeroU8) -> Color {
    let position = f64::from(class.rank()) / f64::from(num_classes.get());
    if position <= 1.0 / 3.0 {
        Color::Green
    } else if position <= 2.0 / 3.0 {
        Color::DarkYellow
    } else {
        Color::Red
    }
}

fn adjustment_color(adjustment: Adjustment) -> Color {
    if adjustment.0 > 0.0 {
        Color::Green
    } else if adjustment.0 < 0.0 {
        Color::Red
    } else {
        Color::Reset
    }
}

#[must_use]
pub fn build_classes_table(
    series: &ClassifiedSeries,
    adjustments: &[Adjustment],
    num_classes: NonZeroU8,
    now: NaiveDateTime,
) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Date", "Start", "End", "Rate", "Class", "Adjustment"]);
    for (slot, adjustment) in series.iter().zip(adjustments) {
        let mut start = Cell::new(slot.interval.start.format("%H:%M"));
        if slot.interval.contains(now) {
            start = start.add_attribute(Attribute::Bold);
        }
        table.add_row(vec![
            Cell::new(slot.interval.start.date()).add_attribute(Attribute::Dim),
            start,
            Cell::new(slot.interval.end.format("%H:%M")).add_attribute(Attribute::Dim),
            Cell::new(slot.rate).set_alignment(CellAlignment::Right),
            Cell::new(slot.class).fg(class_color(slot.class, num_classes)),
            Cell::new(adjustment)
                .set_alignment(CellAlignment::Right)
                .fg(adjustment_color(*adjustment)),
        ]);
    }
    table
}

#[must_use]
pub fn build_intervals_table(intervals: &[(AcceptanceLevel, Vec<MergedInterval>)]) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Priority", "Up to", "Intervals"]);
    for (level, intervals) in intervals {
        let cell = if intervals.is_empty() {
            Cell::new("no slot available").fg(Color::Red)
        } else {
            Cell::new(intervals.iter().join("\n"))
        };
        table.add_row(vec![
            Cell::new(level.priority).set_alignment(CellAlignment::Right),
            Cell::new(format!("Class {}", level.max_class)),
            cell,
        ]);
    }
    table
}

#[must_use]
pub fn build_plan_table(plan: &Plan) -> Table {
    let mut table = new_table();
    table.set_header(vec![
        "Consumer", "Priority", "Start", "End", "Duration", "Power", "Energy", "Phases", "Class",
    ]);
    for assignment in &plan.assignments {
        table.add_row(vec![
            Cell::new(&assignment.consumer).fg(Color::Green),
            Cell::new(assignment.priority).set_alignment(CellAlignment::Right),
            Cell::new(assignment.interval.start.format("%m-%d %H:%M")),
            Cell::new(assignment.interval.end.format("%m-%d %H:%M")).add_attribute(Attribute::Dim),
            Cell::new(assignment.duration).set_alignment(CellAlignment::Right),
            Cell::new(assignment.average_power).set_alignment(CellAlignment::Right),
            Cell::new(assignment.energy).set_alignment(CellAlignment::Right),
            Cell::new(assignment.phases.iter().join(", ")),
            Cell::new(assignment.class),
        ]);
    }
    for skipped in &plan.skipped {
        table.add_row(vec![
            Cell::new(&skipped.consumer).fg(if skipped.reason.is_capacity_exceeded() {
                Color::Red
            } else {
                Color::DarkYellow
            }),
            Cell::new(skipped.priority).set_alignment(CellAlignment::Right),
            Cell::new(&skipped.reason).add_attribute(Attribute::Italic),
        ]);
    }
    table
}

#[must_use]
pub fn build_phase_load_table(plan: &Plan) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Phase", "Committed"]);
    for phase in EnumSet::<Phase>::all() {
        table.add_row(vec![
            Cell::new(phase),
            Cell::new(plan.phase_load.get(phase)).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

const fn consumer_state_color(state: ConsumerState) -> Color {
    match state {
        ConsumerState::Unscheduled => Color::Red,
        ConsumerState::Scheduled => Color::Reset,
        ConsumerState::Running => Color::Green,
        ConsumerState::Completed => Color::DarkGrey,
    }
}

#[must_use]
pub fn build_switches_table(switches: &[Switch]) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Consumer", "Start", "End", "Switch", "Since", "State"]);
    for switch in switches {
        let (actuator, since) = match switch.actuator {
            ActuatorState::Idle => ("idle".to_string(), None),
            ActuatorState::Starting { since } => ("starting".to_string(), Some(since)),
            ActuatorState::Running { since } => ("running".to_string(), Some(since)),
            ActuatorState::Stopping { since } => ("stopping".to_string(), Some(since)),
            ActuatorState::Verified { at } => ("verified".to_string(), Some(at)),
            ActuatorState::Failed { at, failure } => (format!("failed: {failure}"), Some(at)),
        };
        table.add_row(vec![
            Cell::new(&switch.consumer),
            Cell::new(switch.interval.start.format("%m-%d %H:%M")),
            Cell::new(switch.interval.end.format("%m-%d %H:%M")).add_attribute(Attribute::Dim),
            Cell::new(actuator),
            Cell::new(since.map_or_else(String::new, |since| since.format("%H:%M:%S").to_string()))
                .add_attribute(Attribute::Dim),
            Cell::new(switch.state).fg(consumer_state_color(switch.state)),
        ]);
    }
    table
}
