//! # Error Types
//!
//! Custom error types for Ground Link using `thiserror`.

use thiserror::Error;

/// Main error type for Ground Link
#[derive(Debug, Error)]
pub enum GroundLinkError {
    /// Serial link errors (open/read failures)
    #[error("Serial link error: {0}")]
    Serial(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Mission log store errors
    #[error("Log store error: {0}")]
    LogStore(#[from] csv::Error),

    /// CSV replay source errors
    #[error("Replay error: {0}")]
    Replay(String),
}

/// Result type alias for Ground Link
pub type Result<T> = std::result::Result<T, GroundLinkError>;
