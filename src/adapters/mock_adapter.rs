//! Mock SCPI endpoint for testing
//!
//! Simulates an instrument without hardware. It provides:
//! - Scripted replies per query (persistent, or queued one-shot)
//! - Controllable failure injection
//! - Call logging for test verification

use crate::error::{FieldFoxError, FieldFoxResult};
use crate::traits::ScpiEndpoint;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// One exchange recorded by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScpiCall {
    /// Command sent without reading a reply
    Write(String),
    /// Command sent and answered
    Query(String),
}

impl ScpiCall {
    /// The command text, regardless of exchange kind
    pub fn command(&self) -> &str {
        match self {
            ScpiCall::Write(cmd) | ScpiCall::Query(cmd) => cmd,
        }
    }
}

#[derive(Default)]
struct Script {
    persistent: HashMap<String, String>,
    queued: HashMap<String, VecDeque<String>>,
}

/// Mock SCPI endpoint
///
/// Clones share state, so a test can keep a handle for inspection after
/// moving the endpoint into a session.
///
/// # Example
///
/// ```
/// use fieldfox_panel::adapters::MockScpiEndpoint;
///
/// let mock = MockScpiEndpoint::new().with_response("*IDN?", "Mock,FieldFox,0,1.0");
/// assert!(mock.is_connected());
/// ```
#[derive(Clone)]
pub struct MockScpiEndpoint {
    connected: Arc<AtomicBool>,
    should_fail_next: Arc<AtomicBool>,
    script: Arc<Mutex<Script>>,
    call_log: Arc<Mutex<Vec<ScpiCall>>>,
}

impl Default for MockScpiEndpoint {
    fn default() -> Self {
        Self::new()
    }
}

impl MockScpiEndpoint {
    /// Create a connected mock with no scripted replies
    pub fn new() -> Self {
        Self {
            connected: Arc::new(AtomicBool::new(true)),
            should_fail_next: Arc::new(AtomicBool::new(false)),
            script: Arc::new(Mutex::new(Script::default())),
            call_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Mock preloaded with plausible FieldFox replies
    ///
    /// The sweep reports `num_points` points and the trace is a single peak of
    /// `peak_dbm` in the middle of the span over a -90 dBm floor.
    pub fn fieldfox(num_points: u32, peak_dbm: f64) -> Self {
        let n = num_points as usize;
        let trace: Vec<String> = (0..n)
            .map(|i| {
                let offset = i.abs_diff(n / 2) as f64;
                let level = (peak_dbm - 6.0 * offset).max(-90.0);
                format!("{:.6E}", level)
            })
            .collect();

        Self::new()
            .with_response("*IDN?", "Keysight Technologies,N9918A,MOCK0001,A.10.17")
            .with_response("INST:SEL 'SA';*OPC?", "1")
            .with_response("INST:SEL 'NA';*OPC?", "1")
            .with_response("SENS:SWE:POIN?", &num_points.to_string())
            .with_response("CALC:MARK1:Y?", &format!("{:.6E}", peak_dbm))
            .with_response("TRAC1:DATA?", &trace.join(","))
            .with_response("SYST:ERR?", "+0,\"No error\"")
    }

    /// Reply to `query` with `reply` every time it is asked
    pub fn with_response(self, query: &str, reply: &str) -> Self {
        self.set_response(query, reply);
        self
    }

    /// Replace the persistent reply for `query`
    pub fn set_response(&self, query: &str, reply: &str) {
        lock(&self.script)
            .persistent
            .insert(query.to_string(), reply.to_string());
    }

    /// Queue a one-shot reply, used before any persistent reply
    pub fn push_response(&self, query: &str, reply: &str) {
        lock(&self.script)
            .queued
            .entry(query.to_string())
            .or_default()
            .push_back(reply.to_string());
    }

    /// Inject a connection failure for the next exchange
    pub fn inject_next_failure(&self) {
        self.should_fail_next.store(true, Ordering::SeqCst);
    }

    fn check_failure(&self) -> bool {
        self.should_fail_next.swap(false, Ordering::SeqCst)
    }

    /// Check if currently connected
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Get the call log
    pub fn call_log(&self) -> Vec<ScpiCall> {
        lock(&self.call_log).clone()
    }

    /// Command strings of every exchange, in order
    pub fn commands(&self) -> Vec<String> {
        lock(&self.call_log)
            .iter()
            .map(|call| call.command().to_string())
            .collect()
    }

    /// Command strings of write-only exchanges, in order
    pub fn writes(&self) -> Vec<String> {
        lock(&self.call_log)
            .iter()
            .filter_map(|call| match call {
                ScpiCall::Write(cmd) => Some(cmd.clone()),
                ScpiCall::Query(_) => None,
            })
            .collect()
    }

    /// Clear the call log
    pub fn clear_log(&self) {
        lock(&self.call_log).clear();
    }

    fn log_call(&self, call: ScpiCall) {
        lock(&self.call_log).push(call);
    }

    fn ensure_available(&self) -> FieldFoxResult<()> {
        if self.check_failure() {
            return Err(FieldFoxError::Connection("Injected failure".to_string()));
        }
        if !self.is_connected() {
            return Err(FieldFoxError::Connection("Not connected".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ScpiEndpoint for MockScpiEndpoint {
    async fn write(&self, cmd: &str) -> FieldFoxResult<()> {
        self.log_call(ScpiCall::Write(cmd.to_string()));
        self.ensure_available()
    }

    async fn query(&self, cmd: &str) -> FieldFoxResult<String> {
        self.log_call(ScpiCall::Query(cmd.to_string()));
        self.ensure_available()?;

        let mut script = lock(&self.script);
        if let Some(reply) = script.queued.get_mut(cmd).and_then(VecDeque::pop_front) {
            return Ok(reply);
        }
        script.persistent.get(cmd).cloned().ok_or_else(|| {
            // A real instrument would simply never answer
            FieldFoxError::Connection(format!("timed out waiting for reply to '{}'", cmd))
        })
    }

    async fn disconnect(&self) -> FieldFoxResult<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn describe(&self) -> String {
        "MockScpiEndpoint".to_string()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_persistent_response() {
        let mock = MockScpiEndpoint::new().with_response("*IDN?", "Mock");
        assert_eq!(mock.query("*IDN?").await.unwrap(), "Mock");
        assert_eq!(mock.query("*IDN?").await.unwrap(), "Mock");
    }

    #[tokio::test]
    async fn test_queued_response_takes_precedence() {
        let mock = MockScpiEndpoint::new().with_response("SENS:SWE:POIN?", "401");
        mock.push_response("SENS:SWE:POIN?", "201");
        assert_eq!(mock.query("SENS:SWE:POIN?").await.unwrap(), "201");
        assert_eq!(mock.query("SENS:SWE:POIN?").await.unwrap(), "401");
    }

    #[tokio::test]
    async fn test_unscripted_query_times_out() {
        let mock = MockScpiEndpoint::new();
        let err = mock.query("FOO?").await.unwrap_err();
        assert!(err.is_connection());
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let mock = MockScpiEndpoint::new();
        mock.inject_next_failure();
        assert!(mock.write("*CLS").await.is_err());
        // Failure should be consumed
        assert!(mock.write("*CLS").await.is_ok());
    }

    #[tokio::test]
    async fn test_call_log() {
        let mock = MockScpiEndpoint::new().with_response("*IDN?", "Mock");
        mock.write("*CLS").await.unwrap();
        mock.query("*IDN?").await.unwrap();

        assert_eq!(
            mock.call_log(),
            vec![
                ScpiCall::Write("*CLS".to_string()),
                ScpiCall::Query("*IDN?".to_string())
            ]
        );
        assert_eq!(mock.writes(), vec!["*CLS".to_string()]);

        mock.clear_log();
        assert!(mock.commands().is_empty());
    }

    #[tokio::test]
    async fn test_disconnect() {
        let mock = MockScpiEndpoint::new();
        mock.disconnect().await.unwrap();
        assert!(!mock.is_connected());
        assert!(mock.write("*CLS").await.is_err());
    }

    #[tokio::test]
    async fn test_fieldfox_preset_trace_shape() {
        let mock = MockScpiEndpoint::fieldfox(11, -20.0);
        let trace = mock.query("TRAC1:DATA?").await.unwrap();
        let values: Vec<f64> = trace.split(',').map(|v| v.parse().unwrap()).collect();
        assert_eq!(values.len(), 11);
        assert_eq!(values[5], -20.0);
        assert_eq!(mock.query("SENS:SWE:POIN?").await.unwrap(), "11");
    }
}
