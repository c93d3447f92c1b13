//! ScpiEndpoint trait
//!
//! Transport-agnostic interface for SCPI command execution.
//! Implementations handle the link details (raw TCP socket, scripted mock).

use crate::error::FieldFoxResult;
use async_trait::async_trait;

/// SCPI endpoint trait
///
/// ## Exchange model
/// - The instrument never pushes data; every reply answers exactly one query
/// - `write` sends a command and reads nothing back
/// - `query` sends a command and reads one reply line, as one atomic exchange
///
/// ## Concurrency
/// - Implementations must hold their link lock across the write/read pair of
///   a `query` so that two callers can never interleave command and reply
///
/// ## Error Recovery
/// - None. A failed exchange is returned to the caller as-is; the endpoint is
///   never reconnected automatically
#[async_trait]
pub trait ScpiEndpoint: Send + Sync {
    /// Send command without expecting a response
    ///
    /// # Arguments
    /// * `cmd` - SCPI command string (e.g., "SENS:FREQ:CENT 1e9")
    ///
    /// # Errors
    /// - Connection closed or write timeout
    async fn write(&self, cmd: &str) -> FieldFoxResult<()>;

    /// Send command and read one reply line
    ///
    /// # Arguments
    /// * `cmd` - SCPI command string (e.g., "*IDN?", "TRAC1:DATA?")
    ///
    /// # Returns
    /// The reply with its line terminator and surrounding whitespace removed
    ///
    /// # Errors
    /// - Connection closed
    /// - Read timeout
    async fn query(&self, cmd: &str) -> FieldFoxResult<String>;

    /// Close the link. Further exchanges fail with a connection error.
    async fn disconnect(&self) -> FieldFoxResult<()>;

    /// Short human readable description of the link (used in logs)
    fn describe(&self) -> String;
}
