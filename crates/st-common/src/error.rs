//! Error types for Stream Triage.
//!
//! Structured error handling with stable numeric codes for machine parsing,
//! category classification for grouping, and recoverability hints that the
//! per-key state machines act on: every recoverable detection error is
//! absorbed by a state reset, grouping violations are surfaced to the host,
//! and only configuration errors abort construction.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for Stream Triage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Malformed or unroutable measurements.
    Input,
    /// Detector-internal numerical or state errors.
    Detection,
    /// Event grouping contract violations.
    Grouping,
    /// Out-of-range or unparseable configuration.
    Config,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Input => write!(f, "input"),
            ErrorCategory::Detection => write!(f, "detection"),
            ErrorCategory::Grouping => write!(f, "grouping"),
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for Stream Triage.
#[derive(Error, Debug)]
pub enum Error {
    // Input errors (10-19)
    #[error("invalid measurement: {0}")]
    InvalidInput(String),

    // Detection errors (20-29)
    #[error("update produced an empty run set for stream {stream}")]
    EmptyRunSet { stream: String },

    #[error("posterior weights saturated for stream {stream}: {detail}")]
    ArithmeticSaturation { stream: String, detail: String },

    // Grouping errors (30-39)
    #[error("event group spans multiple streams: {0}")]
    MultiStreamGroup(String),

    // Configuration errors (40-49)
    #[error("configuration error: {0}")]
    Config(String),

    // I/O errors (50-59)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Returns the stable error code for this error type.
    ///
    /// Codes are grouped by category:
    /// - 10-19: Input errors
    /// - 20-29: Detection errors
    /// - 30-39: Grouping errors
    /// - 40-49: Configuration errors
    /// - 50-59: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::InvalidInput(_) => 10,
            Error::EmptyRunSet { .. } => 20,
            Error::ArithmeticSaturation { .. } => 21,
            Error::MultiStreamGroup(_) => 30,
            Error::Config(_) => 40,
            Error::Io(_) => 50,
            Error::Serialization(_) => 51,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidInput(_) => ErrorCategory::Input,
            Error::EmptyRunSet { .. } | Error::ArithmeticSaturation { .. } => {
                ErrorCategory::Detection
            }
            Error::MultiStreamGroup(_) => ErrorCategory::Grouping,
            Error::Config(_) => ErrorCategory::Config,
            Error::Io(_) | Error::Serialization(_) => ErrorCategory::Io,
        }
    }

    /// Returns whether this error is absorbed by the per-key state machine.
    ///
    /// Recoverable errors never propagate past the shard that produced
    /// them: invalid input is dropped, detection errors force a state
    /// reset seeded with the offending measurement. Grouping violations
    /// reject the message but leave the system running; configuration
    /// errors abort construction.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::InvalidInput(_) => true,
            Error::EmptyRunSet { .. } => true,
            Error::ArithmeticSaturation { .. } => true,
            Error::MultiStreamGroup(_) => false,
            Error::Config(_) => false,
            Error::Io(_) => true,
            Error::Serialization(_) => true,
        }
    }
}
