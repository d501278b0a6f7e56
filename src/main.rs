//! # Ground Link
//!
//! Ground station telemetry ingestion for XBee-linked rocket avionics.
//!
//! Reads line-oriented telemetry frames from the wireless serial link
//! (or replays a recorded mission CSV), reassembles and parses them
//! into structured records, and fans them out to the console panel,
//! the plot buffer, and the health monitor.

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{info, warn};

use ground_link::config::{Config, InputSource};
use ground_link::dispatch::console::ConsolePanel;
use ground_link::dispatch::plot::PlotBuffer;
use ground_link::dispatch::FanoutDispatcher;
use ground_link::ingest::{ConnectionState, IngestWorker, EVENT_QUEUE_CAPACITY};
use ground_link::logstore::CsvLogStore;
use ground_link::monitor::{HealthMonitor, SeverityLevel};
use ground_link::replay::CsvReplaySource;

/// Configuration file used when none is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Main entry point for the Ground Link station
///
/// Wires the ingestion pipeline together and runs it until the input
/// source ends or Ctrl+C is received:
///
/// 1. **Initialization** - set up logging, load configuration, open the
///    mission log store, attach the consumer sinks
/// 2. **Ingestion** - start the configured input source (live serial or
///    CSV replay) and drain its event queue through the dispatcher
/// 3. **Shutdown** - stop the source, let the final `PORT CLOSED`
///    event flow through, and report the session summary
///
/// # Errors
///
/// Returns error if the configuration is invalid or the mission log
/// store cannot be opened
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Ground Link v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = if std::path::Path::new(&config_path).is_file() {
        Config::load(&config_path)?
    } else {
        info!("No config file at {}; using defaults", config_path);
        Config::default()
    };

    let store = CsvLogStore::open(&config.log.path)?;
    info!("Mission log store at {}", config.log.path);

    let monitor = HealthMonitor::new(&config.monitor, Box::new(store));
    let mut health = monitor.status();
    tokio::spawn(async move {
        while health.changed().await.is_ok() {
            let status = health.borrow().clone();
            match (status.level, status.reason) {
                (SeverityLevel::Critical, Some(reason)) => warn!("HEALTH CRITICAL: {}", reason),
                (SeverityLevel::Degraded, Some(reason)) => warn!("Health degraded: {}", reason),
                _ => {}
            }
        }
    });

    let plot = PlotBuffer::new();
    let plot_reader = plot.reader();

    let mut dispatcher = FanoutDispatcher::new();
    dispatcher.attach(Box::new(ConsolePanel::new()));
    dispatcher.attach(Box::new(plot));
    dispatcher.attach(Box::new(monitor));

    match config.input.source {
        InputSource::Serial => {
            info!(
                "Input source: serial ({} @ {} baud)",
                config.serial.port, config.serial.baud_rate
            );
            let (mut worker, events) = IngestWorker::new(config.serial.clone());
            let dispatch_task = tokio::spawn(dispatcher.run(events));

            let mut state = worker.state();
            worker.start();

            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Received Ctrl+C, shutting down...");
                    worker.stop();
                }
                _ = async {
                    loop {
                        let done = matches!(
                            *state.borrow_and_update(),
                            ConnectionState::Closed | ConnectionState::Failed(_)
                        );
                        if done || state.changed().await.is_err() {
                            break;
                        }
                    }
                } => {
                    info!("Ingestion session ended");
                }
            }

            // Dropping the worker closes the event queue once the
            // session task has emitted its final event
            drop(worker);
            dispatch_task.await?;
        }
        InputSource::Replay => {
            info!("Input source: replay ({})", config.replay.path);
            let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
            let replay_task = tokio::spawn(CsvReplaySource::new(&config.replay).run(events_tx));
            let mut dispatch_task = tokio::spawn(dispatcher.run(events_rx));

            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Received Ctrl+C, shutting down...");
                    replay_task.abort();
                }
                _ = &mut dispatch_task => {}
            }

            if !dispatch_task.is_finished() {
                dispatch_task.await?;
            }
        }
    }

    let altitude = plot_reader.snapshot("bmp_alt");
    if let Some(peak) = altitude.iter().map(|p| p.value).reduce(f64::max) {
        info!("Peak altitude this session: {:.1} m", peak);
    }
    info!("Ground Link stopped");

    Ok(())
}
