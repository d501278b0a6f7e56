//! # Serial Ingestion Module
//!
//! Owns the XBee serial link lifecycle and produces telemetry records.
//!
//! This module handles:
//! - Opening the serial port at the configured baud rate (default 9600)
//! - Running the read loop on a dedicated task
//! - Feeding raw lines through the frame assembler and field parser
//! - Emitting connection and record events over a bounded queue
//! - Clean shutdown without blocking the caller

use crate::config::SerialConfig;
use crate::error::{GroundLinkError, Result};
use crate::frame::{parser::parse_frame, FrameAssembler};
use crate::telemetry::TelemetryRecord;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

/// XBee link baud rate used by the flight radio
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Capacity of the producer -> dispatcher event queue.
///
/// Large enough to absorb consumer hiccups at frame rate; a sustained
/// slow consumer applies backpressure instead of growing memory.
pub const EVENT_QUEUE_CAPACITY: usize = 256;

/// Connection lifecycle of one ingestion session.
///
/// Owned exclusively by the worker; observers read it through the
/// [`IngestWorker::state`] watch channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// No session started
    Idle,
    /// Session spawned, port not yet open
    Opening,
    /// Port open, read loop active
    Reading,
    /// Session ended by an explicit stop
    Closed,
    /// Session ended by an open or read failure
    Failed(String),
}

/// Events emitted by the ingestion worker, in wire order
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    /// Port opened successfully (payload: port identifier)
    Connected(String),
    /// Link terminated or failed (payload: short reason string)
    ConnectionLost(String),
    /// One completed, non-empty telemetry record
    Record(TelemetryRecord),
}

/// Seam for opening the underlying byte stream, so the worker can be
/// driven by an in-memory stream in tests.
pub trait PortOpener: Send + Sync + 'static {
    /// Concrete stream type produced by this opener
    type Stream: AsyncRead + Send + Unpin + 'static;

    /// Open the stream for the given port identifier and baud rate
    ///
    /// # Errors
    ///
    /// Returns error if the device cannot be opened
    fn open(&self, port: &str, baud_rate: u32) -> Result<Self::Stream>;
}

/// Opens a real serial device with 8N1 framing
pub struct NativePortOpener;

impl PortOpener for NativePortOpener {
    type Stream = tokio_serial::SerialStream;

    fn open(&self, port: &str, baud_rate: u32) -> Result<Self::Stream> {
        let stream = tokio_serial::new(port, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| GroundLinkError::Serial(format!("Failed to open {}: {}", port, e)))?;

        Ok(stream)
    }
}

/// How the read loop ended
enum SessionEnd {
    /// `stop()` was requested, or every event receiver went away
    Stopped,
    /// The device read failed mid-stream
    ReadError(String),
}

/// XBee Telemetry Ingestion Worker
///
/// Spawns one read-loop task per session. Raw lines are reassembled
/// into frames, parsed into records, and pushed into the event queue
/// returned by [`IngestWorker::new`]. `start` is idempotent while a
/// session is running; `stop` signals shutdown without blocking and
/// the final `ConnectionLost("PORT CLOSED")` event marks termination.
pub struct IngestWorker<O: PortOpener = NativePortOpener> {
    config: SerialConfig,
    opener: O,
    events_tx: mpsc::Sender<WorkerEvent>,
    shutdown_tx: watch::Sender<bool>,
    state_tx: watch::Sender<ConnectionState>,
    task: Option<JoinHandle<()>>,
}

impl IngestWorker<NativePortOpener> {
    /// Create a worker for a real serial device.
    ///
    /// Returns the worker and the receiving end of the event queue;
    /// hand the receiver to a [`FanoutDispatcher`](crate::dispatch::FanoutDispatcher).
    pub fn new(config: SerialConfig) -> (Self, mpsc::Receiver<WorkerEvent>) {
        Self::with_opener(config, NativePortOpener)
    }
}

impl<O: PortOpener> IngestWorker<O> {
    /// Create a worker with a custom port opener (used by tests)
    pub fn with_opener(config: SerialConfig, opener: O) -> (Self, mpsc::Receiver<WorkerEvent>) {
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let (shutdown_tx, _) = watch::channel(false);
        let (state_tx, _) = watch::channel(ConnectionState::Idle);

        let worker = Self {
            config,
            opener,
            events_tx,
            shutdown_tx,
            state_tx,
            task: None,
        };

        (worker, events_rx)
    }

    /// Observe the connection state of the current session
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// True while a session task is alive
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Start the ingestion session.
    ///
    /// No-op if a session is already running. Otherwise resets the
    /// shutdown flag and spawns the read-loop task; the caller learns
    /// the outcome of the port open through the event queue
    /// (`Connected` or `ConnectionLost("OPEN FAIL: …")`).
    pub fn start(&mut self) {
        if self.is_running() {
            debug!("Ingestion already running on {}; start ignored", self.config.port);
            return;
        }

        self.shutdown_tx.send_replace(false);
        self.state_tx.send_replace(ConnectionState::Opening);

        let stream = self.opener.open(&self.config.port, self.config.baud_rate);
        let events = self.events_tx.clone();
        let shutdown = self.shutdown_tx.subscribe();
        let state = self.state_tx.clone();
        let port = self.config.port.clone();
        let read_timeout = Duration::from_millis(self.config.read_timeout_ms);

        self.task = Some(tokio::spawn(async move {
            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    // No retry; reconnection is a user-initiated action
                    warn!("Open failed on {}: {}", port, e);
                    state.send_replace(ConnectionState::Failed(e.to_string()));
                    let _ = events
                        .send(WorkerEvent::ConnectionLost(format!("OPEN FAIL: {}", e)))
                        .await;
                    return;
                }
            };

            info!("Telemetry link established on {}", port);
            state.send_replace(ConnectionState::Reading);
            let _ = events.send(WorkerEvent::Connected(port)).await;

            run_session(stream, read_timeout, events, shutdown, state).await;
        }));
    }

    /// Request shutdown of the running session.
    ///
    /// Safe to call repeatedly and from any task; never blocks. The
    /// session has actually ended once `ConnectionLost("PORT CLOSED")`
    /// comes through the event queue.
    pub fn stop(&self) {
        self.shutdown_tx.send_replace(true);
    }
}

/// Drive an open stream until stop, read error, or end of stream, then
/// emit the terminal events.
///
/// Every exit path of an established session releases the stream and
/// emits a final `ConnectionLost("PORT CLOSED")` so subscribers can
/// reliably detect termination.
async fn run_session<R>(
    stream: R,
    read_timeout: Duration,
    events: mpsc::Sender<WorkerEvent>,
    mut shutdown: watch::Receiver<bool>,
    state: watch::Sender<ConnectionState>,
) where
    R: AsyncRead + Unpin,
{
    let outcome = read_loop(stream, read_timeout, &events, &mut shutdown).await;

    match outcome {
        SessionEnd::Stopped => {
            info!("Ingestion stopped");
            state.send_replace(ConnectionState::Closed);
        }
        SessionEnd::ReadError(reason) => {
            warn!("Read failure: {}", reason);
            let _ = events
                .send(WorkerEvent::ConnectionLost(format!("READ ERR: {}", reason)))
                .await;
            state.send_replace(ConnectionState::Failed(reason));
        }
    }

    let _ = events
        .send(WorkerEvent::ConnectionLost("PORT CLOSED".to_string()))
        .await;
}

async fn read_loop<R>(
    stream: R,
    read_timeout: Duration,
    events: &mpsc::Sender<WorkerEvent>,
    shutdown: &mut watch::Receiver<bool>,
) -> SessionEnd
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stream).lines();
    let mut assembler = FrameAssembler::new();

    loop {
        if *shutdown.borrow() {
            return SessionEnd::Stopped;
        }

        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    return SessionEnd::Stopped;
                }
            }
            read = timeout(read_timeout, lines.next_line()) => {
                match read {
                    // Timeout with no data is not an error
                    Err(_elapsed) => continue,
                    Ok(Ok(Some(line))) => {
                        if let Some(complete) = handle_line(&line, &mut assembler) {
                            if events.send(WorkerEvent::Record(complete)).await.is_err() {
                                // All receivers gone; nothing left to feed
                                return SessionEnd::Stopped;
                            }
                        }
                    }
                    Ok(Ok(None)) => return SessionEnd::ReadError("stream closed".to_string()),
                    Ok(Err(e)) => return SessionEnd::ReadError(e.to_string()),
                }
            }
        }
    }
}

/// Push one raw line through the assembler; returns a parsed record
/// when the line completed a frame with at least one recognized field.
fn handle_line(line: &str, assembler: &mut FrameAssembler) -> Option<TelemetryRecord> {
    let frame = assembler.push_line(line.trim())?;
    let record = parse_frame(&frame);
    if record.is_empty() {
        debug!("Frame of {} lines carried no recognized fields", frame.len());
        return None;
    }
    Some(record)
}
