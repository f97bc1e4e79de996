#![allow(clippy::doc_markdown)]
#![doc = include_str!("../README.md")]

mod api;
mod cli;
mod clock;
mod config;
mod core;
mod cycle;
mod guard;
mod prelude;
mod quantity;
mod report;
mod tables;

use std::{thread::sleep, time::Duration};

use clap::{Parser, crate_version};
use tracing_subscriber::EnvFilter;

use crate::{
    api::SnapshotFile,
    cli::{Args, Command},
    config::Settings,
    cycle::{Cycle, Outcome},
    prelude::*,
    report::Report,
    tables::{
        build_classes_table,
        build_intervals_table,
        build_phase_load_table,
        build_plan_table,
        build_switches_table,
    },
};

fn main() -> Result {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .without_time()
        .compact()
        .init();
    info!(version = crate_version!(), "starting…");

    let args = Args::parse();
    let mut settings = Settings::read_from(&args.config)?;
    args.overrides.apply(&mut settings);

    let feed = SnapshotFile::new(args.prices.clone());
    let clock = args.clock();
    let cycle = Cycle::try_new(&settings, &feed, &feed, clock.as_ref())?;

    if let Command::Watch { interval_seconds } = args.command {
        let interval = Duration::from_secs(interval_seconds);
        info!(?interval, "watching…");
        loop {
            match cycle.run()? {
                Some(outcome) => print(&args, &settings, &outcome)?,
                None => warn!("nothing to show"),
            }
            sleep(interval);
        }
    }

    let Some(outcome) = cycle.run()? else {
        warn!("nothing to show");
        return Ok(());
    };
    print(&args, &settings, &outcome)?;

    info!("done!");
    Ok(())
}

fn print(args: &Args, settings: &Settings, outcome: &Outcome) -> Result {
    if args.json {
        print_json(args.command, outcome)
    } else {
        print_tables(args.command, settings, outcome);
        Ok(())
    }
}

fn print_json(command: Command, outcome: &Outcome) -> Result {
    let report = Report::from(outcome);
    let json = match command {
        Command::Classify => serde_json::to_string_pretty(&report.classification)?,
        Command::Slots => serde_json::to_string_pretty(&report.intervals)?,
        Command::Schedule => serde_json::to_string_pretty(&report.schedule)?,
        Command::Signal => serde_json::to_string_pretty(&report.signal)?,
        Command::Run => serde_json::to_string_pretty(&report)?,
        Command::Watch { .. } => serde_json::to_string(&report)?,
    };
    println!("{json}");
    Ok(())
}

fn print_tables(command: Command, settings: &Settings, outcome: &Outcome) {
    let num_classes = settings.classification.num_classes;
    if matches!(command, Command::Classify | Command::Run) {
        println!(
            "{}",
            build_classes_table(&outcome.series, &outcome.adjustments, num_classes, outcome.now),
        );
    }
    if matches!(command, Command::Slots | Command::Run) {
        println!("{}", build_intervals_table(&outcome.intervals));
    }
    if matches!(command, Command::Schedule | Command::Run) {
        println!("{}", build_plan_table(&outcome.plan));
        println!("{}", build_phase_load_table(&outcome.plan));
    }
    if matches!(command, Command::Schedule | Command::Run | Command::Watch { .. }) {
        println!("{}", build_switches_table(&outcome.switches));
    }
    if matches!(command, Command::Signal | Command::Run | Command::Watch { .. }) {
        match outcome.signal {
            Some(signal) => println!(
                "Throttle signal: {} (from {} to {}, {:.0}% through the transition)",
                signal.value,
                signal.from,
                signal.to,
                signal.fraction * 100.0,
            ),
            None => println!("Throttle signal: unknown"),
        }
    }
}
