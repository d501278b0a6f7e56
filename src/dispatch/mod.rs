//! # Fan-out Distribution Module
//!
//! Delivers each worker event to every subscribed consumer.
//!
//! This module handles:
//! - The `TelemetrySink` capability trait consumers implement
//! - Draining the worker event queue on the consumer-side task
//! - Isolating sink failures so one bad consumer cannot starve the rest

pub mod console;
pub mod plot;

use crate::ingest::WorkerEvent;
use crate::telemetry::TelemetryRecord;
use tokio::sync::mpsc;
use tracing::{debug, warn};

#[cfg(test)]
use mockall::automock;

/// Capability interface for telemetry consumers.
///
/// Every consumer (display panel, plot buffer, health monitor, log
/// appender) implements this; there is no runtime probing for optional
/// methods. Connection callbacks default to no-ops for sinks that only
/// care about records.
#[cfg_attr(test, automock)]
pub trait TelemetrySink: Send {
    /// Short name used in failure diagnostics
    fn name(&self) -> &str;

    /// Link established on the given port
    fn on_connected(&mut self, _port: &str) {}

    /// Link terminated, with a short reason ("PORT CLOSED", "READ ERR: …")
    fn on_connection_lost(&mut self, _reason: &str) {}

    /// One resolved telemetry record.
    ///
    /// # Errors
    ///
    /// A sink may fail; the dispatcher logs the error and carries on.
    /// Failures never propagate to the producer.
    fn on_record(&mut self, record: &TelemetryRecord) -> anyhow::Result<()>;
}

/// Fans worker events out to all attached sinks.
///
/// Sinks are attached before [`run`](FanoutDispatcher::run) is called;
/// the subscriber list is never mutated while the event queue is being
/// drained. Delivery order across sinks is unspecified.
#[derive(Default)]
pub struct FanoutDispatcher {
    sinks: Vec<Box<dyn TelemetrySink>>,
}

impl FanoutDispatcher {
    /// Create a dispatcher with no subscribers
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a consumer. Only valid while ingestion is stopped.
    pub fn attach(&mut self, sink: Box<dyn TelemetrySink>) {
        debug!("Attached telemetry sink '{}'", sink.name());
        self.sinks.push(sink);
    }

    /// Number of attached consumers
    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Drain the worker event queue until it closes.
    ///
    /// Runs on the consumer-side task; each event is dispatched
    /// synchronously to every sink before the next event is taken, so
    /// records reach each sink in wire order.
    pub async fn run(mut self, mut events: mpsc::Receiver<WorkerEvent>) {
        while let Some(event) = events.recv().await {
            self.dispatch(&event);
        }
        debug!("Event queue closed; dispatcher exiting");
    }

    /// Deliver one event to all sinks, isolating per-sink failures
    pub fn dispatch(&mut self, event: &WorkerEvent) {
        for sink in &mut self.sinks {
            match event {
                WorkerEvent::Connected(port) => sink.on_connected(port),
                WorkerEvent::ConnectionLost(reason) => sink.on_connection_lost(reason),
                WorkerEvent::Record(record) => {
                    if let Err(e) = sink.on_record(record) {
                        warn!("Sink '{}' failed to handle record: {:#}", sink.name(), e);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::always;
    use std::sync::{Arc, Mutex};

    /// Records everything it receives; used where mock call order
    /// expectations would get in the way
    struct RecordingSink {
        name: String,
        seen: Arc<Mutex<Vec<WorkerEvent>>>,
    }

    impl TelemetrySink for RecordingSink {
        fn name(&self) -> &str {
            &self.name
        }

        fn on_connected(&mut self, port: &str) {
            self.seen
                .lock()
                .unwrap()
                .push(WorkerEvent::Connected(port.to_string()));
        }

        fn on_connection_lost(&mut self, reason: &str) {
            self.seen
                .lock()
                .unwrap()
                .push(WorkerEvent::ConnectionLost(reason.to_string()));
        }

        fn on_record(&mut self, record: &TelemetryRecord) -> anyhow::Result<()> {
            self.seen
                .lock()
                .unwrap()
                .push(WorkerEvent::Record(record.clone()));
            Ok(())
        }
    }

    fn recording_sink(name: &str) -> (Box<RecordingSink>, Arc<Mutex<Vec<WorkerEvent>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Box::new(RecordingSink {
            name: name.to_string(),
            seen: Arc::clone(&seen),
        });
        (sink, seen)
    }

    fn sample_record() -> TelemetryRecord {
        let mut record = TelemetryRecord::new();
        record.insert("bme_temp", 21.5);
        record
    }

    #[test]
    fn test_all_sinks_receive_record() {
        let mut dispatcher = FanoutDispatcher::new();
        let (first, first_seen) = recording_sink("first");
        let (second, second_seen) = recording_sink("second");
        dispatcher.attach(first);
        dispatcher.attach(second);

        dispatcher.dispatch(&WorkerEvent::Record(sample_record()));

        assert_eq!(first_seen.lock().unwrap().len(), 1);
        assert_eq!(second_seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_failing_sink_does_not_starve_others() {
        let mut failing = MockTelemetrySink::new();
        failing.expect_name().return_const("failing".to_string());
        failing
            .expect_on_record()
            .with(always())
            .returning(|_| Err(anyhow::anyhow!("consumer exploded")));

        let mut dispatcher = FanoutDispatcher::new();
        dispatcher.attach(Box::new(failing));
        let (healthy, healthy_seen) = recording_sink("healthy");
        dispatcher.attach(healthy);

        dispatcher.dispatch(&WorkerEvent::Record(sample_record()));

        assert_eq!(healthy_seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_connection_events_fan_out() {
        let mut dispatcher = FanoutDispatcher::new();
        let (sink, seen) = recording_sink("panel");
        dispatcher.attach(sink);

        dispatcher.dispatch(&WorkerEvent::Connected("/dev/ttyUSB0".to_string()));
        dispatcher.dispatch(&WorkerEvent::ConnectionLost("PORT CLOSED".to_string()));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], WorkerEvent::Connected("/dev/ttyUSB0".to_string()));
    }

    #[tokio::test]
    async fn test_run_drains_until_queue_closes() {
        let (tx, rx) = mpsc::channel(8);
        let mut dispatcher = FanoutDispatcher::new();
        let (sink, seen) = recording_sink("drain");
        dispatcher.attach(sink);

        tx.send(WorkerEvent::Record(sample_record())).await.unwrap();
        tx.send(WorkerEvent::ConnectionLost("PORT CLOSED".to_string()))
            .await
            .unwrap();
        drop(tx);

        dispatcher.run(rx).await;

        assert_eq!(seen.lock().unwrap().len(), 2);
    }
}
