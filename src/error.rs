//! Custom error types for the driver.
//!
//! `FieldFoxError` is the single error type returned by the SCPI endpoints, the
//! instrument session and the control panel. It follows the taxonomy of the
//! instrument protocol:
//!
//! - **`Connection`**: the instrument is unreachable, the socket was closed or a
//!   read timed out. Fatal for the session; nothing is retried.
//! - **`Parse`**: a reply did not have the expected numeric shape. The offending
//!   command and reply text are kept so the caller can show them to the user.
//! - **`TraceLength`**: a trace reply parsed cleanly but its point count does
//!   not match the sweep point count the instrument reported.
//! - **`Config`** / **`Configuration`**: loading or validating the configuration.
//!
//! A command the instrument silently rejects produces no error at all: SCPI
//! gives the driver no structured error channel for plain writes. Callers that
//! want to check can poll `SYST:ERR?` through
//! [`FieldFoxSession::query_error`](crate::instrument::FieldFoxSession::query_error).

use thiserror::Error;

/// Convenience alias for results using the driver error type.
pub type FieldFoxResult<T> = std::result::Result<T, FieldFoxError>;

/// Errors of the driver and control panel.
#[derive(Error, Debug)]
pub enum FieldFoxError {
    /// Unreachable instrument, closed socket or timeout
    #[error("Connection error: {0}")]
    Connection(String),

    /// Reply that is not the expected number or list of numbers
    #[error("Failed to parse reply to '{command}': {reply:?}")]
    Parse {
        /// Query that produced the reply
        command: String,
        /// Reply text as received
        reply: String,
    },

    /// Trace point count differs from the sweep point count
    #[error("Trace has {actual} points but the instrument reports {expected}")]
    TraceLength {
        /// Sweep points reported by the instrument
        expected: usize,
        /// Values in the trace reply
        actual: usize,
    },

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] figment::Error),

    /// Configuration loaded but failed validation
    #[error("Configuration validation error: {0}")]
    Configuration(String),

    /// File system error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV export failed
    #[error("Export error: {0}")]
    Export(#[from] csv::Error),

    /// No slot at the given column and row
    #[error("Panel slot not found: {0}")]
    SlotNotFound(String),
}

impl FieldFoxError {
    pub(crate) fn parse(command: &str, reply: &str) -> Self {
        Self::Parse {
            command: command.to_string(),
            reply: reply.to_string(),
        }
    }

    /// True for errors that mean the connection is gone.
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}
