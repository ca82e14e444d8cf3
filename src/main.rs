//! Smart meter to InfluxDB2 backfill
//!
//! Fetches quarter-hour readings of one smart meter from the network operator's
//! web portal, one calendar day at a time, and keeps an InfluxDB2 bucket
//! complete and correct.
//!
//! # Commands
//!
//! - `migrate`: backfill backward from yesterday until the portal runs dry
//! - `continue`: resume an interrupted backfill below the earliest stored day
//! - `update` (default): catch up to today, then revalidate the last week
//! - `doctor`: compare stored values with the portal, week by week
//! - `report`: print mean consumption per weekday and six-hour day part
//!
//! A run that gives up on a day the portal never answered exits non-zero.
//!
//! Configuration comes from environment variables, optionally loaded from an
//! env file given with `--config`.

mod config;
mod engine;
mod error;
mod extract;
mod influxdb;
mod model;
mod portal;

#[cfg(test)]
mod test_utils;

use crate::engine::{Engine, EngineSettings, UpdateReport};
use crate::error::Error;
use crate::model::SystemClock;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::signal::ctrl_c;
use tokio::signal::unix::{signal, SignalKind};
use tracing::Instrument;

#[derive(Parser, Debug)]
#[command(version, about = "Backfills smart meter readings into InfluxDB2")]
struct Cli {
    /// Env file to load before reading the environment
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level regardless of LOG_LEVEL
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Backfill backward starting yesterday
    Migrate {
        /// Stop after this many days back
        #[arg(long)]
        max_days: Option<u32>,
    },
    /// Resume backfill below the earliest stored point
    Continue,
    /// Catch up to today and revalidate the trailing window
    Update,
    /// Audit stored values against the portal
    Doctor {
        /// Check at most this many days
        #[arg(long)]
        days: Option<usize>,
    },
    /// Print weekly consumption from stored data
    Report {
        /// Number of weeks, the current one included
        #[arg(long, default_value_t = 3)]
        weeks: u32,
    },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Migrate { .. } => "migrate",
            Command::Continue => "continue",
            Command::Update => "update",
            Command::Doctor { .. } => "doctor",
            Command::Report { .. } => "report",
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        if let Err(e) = dotenvy::from_path(path) {
            eprintln!("Failed to load env file {}: {}", path.display(), e);
            return ExitCode::FAILURE;
        }
    }

    let app_config = match config::load_app_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let level = if cli.debug {
        tracing::Level::DEBUG
    } else {
        app_config.log_level()
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let engine = match build_engine() {
        Ok(engine) => engine,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let command = cli.command.unwrap_or(Command::Update);
    let span = tracing::info_span!("run", command = command.name());

    let mut sig_term = match signal(SignalKind::terminate()) {
        Ok(sig_term) => sig_term,
        Err(e) => {
            tracing::error!("Failed to register SIGTERM handler: {}", e);
            return ExitCode::FAILURE;
        }
    };

    tokio::select! {
        _ = sig_term.recv() => {
            tracing::info!("Received SIGTERM. Exiting...");
            ExitCode::FAILURE
        }
        _ = ctrl_c() => {
            tracing::info!("Received SIGINT. Exiting...");
            ExitCode::FAILURE
        }
        result = run(&engine, command).instrument(span) => match result {
            Ok(true) => ExitCode::SUCCESS,
            Ok(false) => ExitCode::FAILURE,
            Err(e) => {
                tracing::error!("{} aborted: {}", command.name(), e);
                ExitCode::FAILURE
            }
        }
    }
}

/// Wires the portal source and InfluxDB store into an engine.
fn build_engine() -> Result<Engine, Error> {
    let meter_config = config::load_meter_config()?;
    let tz = meter_config.tz()?;
    let policy = config::load_policy_config()?;
    let portal_client = Arc::new(portal::Client::new(config::load_portal_config()?));
    let influx_client = Arc::new(influxdb::Client::new(config::load_influx_config()?));

    let source = Arc::new(portal::PortalSource::new(
        portal_client,
        meter_config.id.clone(),
        tz,
    ));
    let settings = EngineSettings {
        meter_id: meter_config.id,
        tz,
        policy,
    };
    Ok(Engine::new(
        source,
        influx_client,
        Arc::new(SystemClock),
        settings,
    ))
}

/// Converts `--max-days` into the walk's exclusive days-back bound.
fn max_days_back(max_days: Option<u32>) -> Option<u32> {
    max_days.map(|days| days.saturating_add(1))
}

/// Runs one command to completion and logs its summary.
///
/// Returns `false` when the command finished but left work undone.
async fn run(engine: &Engine, command: Command) -> Result<bool, Error> {
    let complete = match command {
        Command::Migrate { max_days } => {
            let report = engine.migrate_full(max_days_back(max_days)).await?;
            tracing::info!(
                days_stored = report.days_stored(),
                iterations = report.iterations(),
                "Migration finished: {}",
                report.stop
            );
            !report.left_day_unresolved()
        }
        Command::Continue => {
            let report = engine.continue_migration().await?;
            tracing::info!(
                anchor = %report.anchor,
                days_stored = report.days_stored(),
                "Continuation finished: {}",
                report.stop
            );
            !report.left_day_unresolved()
        }
        Command::Update => {
            let report = engine.update().await?;
            match &report {
                UpdateReport::FullBackfill(walk) => tracing::info!(
                    days_stored = walk.days_stored(),
                    "Update ran a full backfill: {}",
                    walk.stop
                ),
                UpdateReport::Forward {
                    forward,
                    revalidation,
                } => tracing::info!(
                    days_fetched = forward.days_fetched,
                    reached_today = forward.reached_today,
                    revalidated = revalidation.as_ref().map(|r| r.iterations()).unwrap_or(0),
                    "Update finished"
                ),
            }
            !report.left_day_unresolved()
        }
        Command::Doctor { days } => {
            let report = engine.doctor(days).await?;
            if report.is_clean() {
                tracing::info!(days_checked = report.days_checked, "No integrity issues found");
            } else {
                tracing::warn!(
                    days_checked = report.days_checked,
                    findings = report.findings.len(),
                    unverified = report.days_unverified.len(),
                    "Integrity issues found"
                );
            }
            true
        }
        Command::Report { weeks } => {
            let report = engine.consumption_report(weeks).await?;
            if report.has_data() {
                println!("{}", report);
            } else {
                tracing::warn!(weeks, "No stored consumption to report");
            }
            report.has_data()
        }
    };
    Ok(complete)
}
