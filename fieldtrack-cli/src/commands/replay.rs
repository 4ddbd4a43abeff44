//! `fieldtrack replay` - run a scripted scenario through the tracker.
//!
//! Prints one JSON object per line: every accepted reading and surfaced
//! error the tracker emitted, followed by the final session snapshot.
//! By default the replay runs on a paused Tokio clock, so a scenario that
//! spans minutes finishes instantly with identical timing.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use fieldtrack::config::TrackerConfig;
use fieldtrack::location::{LocationError, LocationTracker, ScriptedProvider};
use fieldtrack::logging::{default_log_dir, default_log_file, init_logging};
use fieldtrack::Reading;
use serde::Serialize;
use tokio::sync::{broadcast, oneshot};
use tokio::time::Instant;

use crate::error::CliError;
use crate::scenario::Scenario;

/// Arguments of the `replay` subcommand.
#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// Scenario file (JSON)
    pub scenario: PathBuf,

    /// Config file to use instead of ~/.fieldtrack/config.ini
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory for the log file
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Run on the wall clock instead of virtual time
    #[arg(long)]
    pub realtime: bool,
}

/// One line of replay output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReplayEvent {
    Accepted {
        at_ms: u64,
        reading: Reading,
    },
    Error {
        at_ms: u64,
        error: LocationError,
    },
    Snapshot {
        at_ms: u64,
        status: String,
        last_accepted: Option<Reading>,
        relaxed_retries: u32,
        has_active_subscription: bool,
    },
}

/// Run the replay subcommand.
pub fn run(args: ReplayArgs) -> Result<(), CliError> {
    let log_dir = args
        .log_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(default_log_dir()));
    let _logging_guard = init_logging(&log_dir, default_log_file())
        .map_err(|e| CliError::LoggingInit(e.to_string()))?;

    let config = match &args.config {
        Some(path) => TrackerConfig::load_from(path)?,
        None => TrackerConfig::load()?,
    };
    let scenario = Scenario::load(&args.scenario)?;

    tracing::info!(
        scenario = %args.scenario.display(),
        one_shots = scenario.one_shots.len(),
        watch_steps = scenario.watch.len(),
        realtime = args.realtime,
        "Replaying scenario"
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .start_paused(!args.realtime)
        .build()
        .map_err(CliError::Runtime)?;

    let events = runtime.block_on(replay(scenario, config))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for event in &events {
        let line = serde_json::to_string(event).map_err(|e| CliError::Output(e.to_string()))?;
        writeln!(out, "{}", line).map_err(|e| CliError::Output(e.to_string()))?;
    }

    Ok(())
}

/// Drive the tracker through `scenario` and collect what it emitted.
pub async fn replay(scenario: Scenario, config: TrackerConfig) -> Result<Vec<ReplayEvent>, CliError> {
    let provider = Arc::new(ScriptedProvider::new());
    for step in &scenario.one_shots {
        let delivery = step.delivery().map_err(|reason| CliError::Scenario {
            path: PathBuf::new(),
            reason,
        })?;
        provider.push_delayed(Duration::from_millis(step.delay_ms), delivery);
    }

    let tracker = LocationTracker::new(provider.clone(), config)?;
    let started = Instant::now();
    let (done_tx, done_rx) = oneshot::channel();
    let collector = tokio::spawn(collect_events(
        tracker.subscribe_readings(),
        tracker.subscribe_errors(),
        started,
        done_rx,
    ));

    tracker.start();

    for step in &scenario.watch {
        tokio::time::sleep_until(started + Duration::from_millis(step.at_ms)).await;
        let delivery = step.delivery().map_err(|reason| CliError::Scenario {
            path: PathBuf::new(),
            reason,
        })?;
        if !provider.deliver(delivery) {
            tracing::warn!(at_ms = step.at_ms, "Watch step dropped, no active subscription");
        }
        tokio::task::yield_now().await;
    }

    tokio::time::sleep_until(started + Duration::from_millis(scenario.stop_at_ms())).await;
    let snapshot = tracker.snapshot();
    tracker.stop();

    let _ = done_tx.send(());
    let mut events = collector
        .await
        .map_err(|e| CliError::Output(e.to_string()))?;

    events.push(ReplayEvent::Snapshot {
        at_ms: elapsed_ms(started),
        status: snapshot.status.to_string(),
        last_accepted: snapshot.last_accepted,
        relaxed_retries: snapshot.high_accuracy_attempt_count,
        has_active_subscription: snapshot.has_active_subscription,
    });

    Ok(events)
}

async fn collect_events(
    mut readings: broadcast::Receiver<Reading>,
    mut errors: broadcast::Receiver<LocationError>,
    started: Instant,
    mut done: oneshot::Receiver<()>,
) -> Vec<ReplayEvent> {
    let mut events = Vec::new();
    loop {
        tokio::select! {
            biased;
            reading = readings.recv() => match reading {
                Ok(reading) => events.push(ReplayEvent::Accepted { at_ms: elapsed_ms(started), reading }),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Replay output lagged behind accepted readings");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            error = errors.recv() => match error {
                Ok(error) => events.push(ReplayEvent::Error { at_ms: elapsed_ms(started), error }),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Replay output lagged behind errors");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = &mut done => break,
        }
    }

    // Anything already queued when the replay ended
    while let Ok(reading) = readings.try_recv() {
        events.push(ReplayEvent::Accepted { at_ms: elapsed_ms(started), reading });
    }
    while let Ok(error) = errors.try_recv() {
        events.push(ReplayEvent::Error { at_ms: elapsed_ms(started), error });
    }
    events
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
