//! # Mission Log Store
//!
//! Append-only persisted log of notable ground-station events.
//!
//! This module handles:
//! - The `LogEntry` row shape and severity kinds
//! - The injected `EventLog` sink interface components log through
//! - The CSV-backed store (append, reload, clear)
//! - Keyword-based anomaly flagging of entries

use crate::error::Result;
use chrono::Local;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Fixed header row of the mission log file
pub const LOG_HEADER: [&str; 7] = [
    "Time",
    "Type",
    "Location",
    "Message",
    "Details",
    "ML_Flag",
    "ML_Details",
];

/// Keywords that flag an entry as anomalous regardless of its kind
const ANOMALY_KEYWORDS: [&str; 7] = [
    "anomaly",
    "unexpected",
    "fail",
    "overflow",
    "exception",
    "nan",
    "reset",
];

/// Severity kind of one log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogKind {
    Info,
    Warning,
    Error,
    Critical,
}

impl LogKind {
    /// Uppercase tag written to the log file
    pub fn as_str(&self) -> &'static str {
        match self {
            LogKind::Info => "INFO",
            LogKind::Warning => "WARNING",
            LogKind::Error => "ERROR",
            LogKind::Critical => "CRITICAL",
        }
    }

    fn from_str(tag: &str) -> Self {
        match tag {
            "WARNING" => LogKind::Warning,
            "ERROR" => LogKind::Error,
            "CRITICAL" => LogKind::Critical,
            _ => LogKind::Info,
        }
    }
}

/// One persisted log row.
///
/// Entries are immutable once appended; the only destructive operation
/// on the store is an explicit [`CsvLogStore::clear`].
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    /// Local timestamp, `YYYY-MM-DD HH:MM:SS.mmm`
    pub time: String,
    /// Severity kind
    pub kind: LogKind,
    /// Originating source tag (sensor or component name)
    pub location: String,
    /// Short message
    pub message: String,
    /// Long detail; defaults to the message
    pub details: String,
    /// Anomaly flag from [`ml_check`]
    pub ml_flag: bool,
    /// Reason the anomaly flag was set
    pub ml_details: String,
}

impl LogEntry {
    /// Build an entry stamped with the current local time.
    ///
    /// The anomaly flag is derived from the kind and message content
    /// via [`ml_check`].
    pub fn new(kind: LogKind, location: &str, message: &str, details: Option<&str>) -> Self {
        let details = details.unwrap_or(message);
        let (ml_flag, ml_details) = ml_check(kind, message, details);
        Self {
            time: Local::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
            kind,
            location: location.to_string(),
            message: message.to_string(),
            details: details.to_string(),
            ml_flag,
            ml_details,
        }
    }
}

/// Check whether an entry should carry the anomaly flag.
///
/// Critical entries always do; otherwise the message and details are
/// scanned for anomaly keywords.
pub fn ml_check(kind: LogKind, message: &str, details: &str) -> (bool, String) {
    if kind == LogKind::Critical {
        return (true, "Critical error".to_string());
    }
    let haystack = format!("{}{}", message.to_lowercase(), details.to_lowercase());
    for keyword in ANOMALY_KEYWORDS {
        if haystack.contains(keyword) {
            return (true, format!("Keyword '{}'", keyword));
        }
    }
    (false, String::new())
}

/// Injected log sink interface.
///
/// Components that detect notable conditions are handed one of these at
/// construction time; nothing writes through a process-wide stream.
pub trait EventLog: Send {
    /// Append one entry to the persisted log
    ///
    /// # Errors
    ///
    /// Returns error if the row cannot be written
    fn append(&mut self, entry: &LogEntry) -> Result<()>;
}

/// CSV-file-backed mission log store
pub struct CsvLogStore {
    path: PathBuf,
}

impl CsvLogStore {
    /// Open the store, creating the file with its header row if absent
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be created or written
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
        };
        if !store.path.is_file() {
            store.write_header()?;
        }
        Ok(store)
    }

    fn write_header(&self) -> Result<()> {
        let mut writer = csv::Writer::from_writer(File::create(&self.path)?);
        writer.write_record(LOG_HEADER)?;
        writer.flush()?;
        Ok(())
    }

    /// Read every persisted entry back, oldest first
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or a row is malformed
    pub fn load(&self) -> Result<Vec<LogEntry>> {
        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut entries = Vec::new();
        for row in reader.records() {
            let row = row?;
            entries.push(LogEntry {
                time: row.get(0).unwrap_or_default().to_string(),
                kind: LogKind::from_str(row.get(1).unwrap_or_default()),
                location: row.get(2).unwrap_or_default().to_string(),
                message: row.get(3).unwrap_or_default().to_string(),
                details: row.get(4).unwrap_or_default().to_string(),
                ml_flag: row.get(5) == Some("1"),
                ml_details: row.get(6).unwrap_or_default().to_string(),
            });
        }
        Ok(entries)
    }

    /// Drop every entry, leaving only the header row
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be rewritten
    pub fn clear(&mut self) -> Result<()> {
        self.write_header()
    }
}

impl EventLog for CsvLogStore {
    fn append(&mut self, entry: &LogEntry) -> Result<()> {
        let file = OpenOptions::new().append(true).open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.write_record([
            entry.time.as_str(),
            entry.kind.as_str(),
            entry.location.as_str(),
            entry.message.as_str(),
            entry.details.as_str(),
            if entry.ml_flag { "1" } else { "0" },
            entry.ml_details.as_str(),
        ])?;
        writer.flush()?;
        Ok(())
    }
}
