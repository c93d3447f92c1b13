//! FieldFox analyzer session.
//!
//! [`FieldFoxSession`] owns the single connection to a Keysight FieldFox
//! handheld analyzer and turns the high level operations of the control panel
//! into SCPI exchanges:
//!
//! | Operation                           | SCPI                                          |
//! |-------------------------------------|-----------------------------------------------|
//! | `configure_spectrum_mode`           | `INST:SEL 'SA';*OPC?`, sweep/frequency setup  |
//! | `configure_network_analyzer_mode`   | `INST:SEL 'NA';*OPC?`, S-parameter phase view |
//! | `save_trace`                        | `MMEM:STOR:SNP "<name>.s2p"`                  |
//! | `maximum_power`                     | `CALC:MARK1:FUNC:MAX`, `CALC:MARK1:Y?`        |
//! | `trace`                             | `TRAC1:DATA?`                                 |
//!
//! Every operation is a plain sequence of request/response exchanges. Nothing
//! is retried; the first failing exchange ends the operation.
//!
//! ## Example
//!
//! ```no_run
//! use fieldfox_panel::instrument::{FieldFoxSession, SessionSettings};
//! use fieldfox_panel::hardware::TcpScpiAdapter;
//!
//! # async fn example() -> fieldfox_panel::error::FieldFoxResult<()> {
//! let adapter = TcpScpiAdapter::connect("TCPIP::192.168.0.1::INSTR").await?;
//! let mut session = FieldFoxSession::open(adapter, SessionSettings::new(1.0e9, 100.0e6)).await?;
//!
//! let peak = session.maximum_power().await?;
//! let trace = session.trace().await?;
//! println!("peak {:.2} dBm over {} points", peak, trace.len());
//! session.close().await?;
//! # Ok(())
//! # }
//! ```

use crate::config::InstrumentConfig;
use crate::error::{FieldFoxError, FieldFoxResult};
use crate::hardware::{TcpScpiAdapter, TcpScpiAdapterBuilder};
use crate::instrument::trace::{
    max_value, parse_count, parse_real, parse_real_list, stimulus_axis, Trace,
};
use crate::traits::ScpiEndpoint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

const IDENTIFY: &str = "*IDN?";
const SELECT_SPECTRUM_MODE: &str = "INST:SEL 'SA';*OPC?";
const SELECT_NETWORK_MODE: &str = "INST:SEL 'NA';*OPC?";
const SWEEP_POINTS_QUERY: &str = "SENS:SWE:POIN?";
const CENTER_FREQUENCY_QUERY: &str = "SENS:FREQ:CENT?";
const SPAN_QUERY: &str = "SENS:FREQ:SPAN?";
const MARKER_TO_MAX: &str = "CALC:MARK1:FUNC:MAX";
const MARKER_VALUE_QUERY: &str = "CALC:MARK1:Y?";
const TRACE_DATA_QUERY: &str = "TRAC1:DATA?";
const ERROR_QUERY: &str = "SYST:ERR?";

/// Resolution bandwidth pushed in spectrum setup (Hz).
pub const RESOLUTION_BANDWIDTH: u32 = 20;
/// Vertical scale pushed in spectrum setup (dB per division).
pub const SCALE_PER_DIVISION: u32 = 15;
/// Default number of sweep points.
pub const DEFAULT_SWEEP_POINTS: u32 = 401;

/// Fixed network analyzer setup of the lab bench: 2x2 split, 950-1050 MHz.
const NETWORK_SETUP: [&str; 4] = [
    ":DISP:WIND:SPL D12_34",
    "FREQ:STAR 950e6",
    "FREQ:STOP 1050e6",
    "CORR 1",
];

/// Measurement slots of the 2x2 display, in display order.
pub const S_PARAMETER_SLOTS: [(u8, &str); 4] = [(1, "S11"), (2, "S21"), (3, "S12"), (4, "S22")];

/// Instrument personality selected with `INST:SEL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalyzerMode {
    /// `SA` personality, used for power measurements
    SpectrumAnalyzer,
    /// `NA` personality, used for S-parameters
    NetworkAnalyzer,
}

impl fmt::Display for AnalyzerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalyzerMode::SpectrumAnalyzer => write!(f, "SA"),
            AnalyzerMode::NetworkAnalyzer => write!(f, "NA"),
        }
    }
}

/// Sweep settings of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Center frequency in Hz
    pub center_frequency: f64,
    /// Span in Hz
    pub span: f64,
    /// Requested sweep points; replaced by the count the instrument reports
    #[serde(default = "default_sweep_points")]
    pub num_points: u32,
    /// Push frequency, span and point count during spectrum setup. When off,
    /// setup only reads the instrument's current values back.
    #[serde(default = "default_debug")]
    pub debug: bool,
}

fn default_sweep_points() -> u32 {
    DEFAULT_SWEEP_POINTS
}

fn default_debug() -> bool {
    true
}

impl SessionSettings {
    /// Settings with the default point count and `debug` on
    pub fn new(center_frequency: f64, span: f64) -> Self {
        Self {
            center_frequency,
            span,
            num_points: DEFAULT_SWEEP_POINTS,
            debug: true,
        }
    }

    /// Request a different number of sweep points
    pub fn with_num_points(mut self, num_points: u32) -> Self {
        self.num_points = num_points;
        self
    }

    /// Toggle pushing the sweep settings during setup
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// First frequency of the sweep
    pub fn start_frequency(&self) -> f64 {
        self.center_frequency - self.span / 2.0
    }

    /// Last frequency of the sweep
    pub fn stop_frequency(&self) -> f64 {
        self.center_frequency + self.span / 2.0
    }
}

/// Result of a maximum power measurement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PowerReading {
    /// Marker 1 value after peak search
    pub marker_dbm: f64,
    /// Largest point of the trace read right after the marker
    pub trace_max_dbm: f64,
    /// When the reading was taken
    pub timestamp: DateTime<Utc>,
}

/// Entry of the instrument's error queue (`SYST:ERR?`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstrumentError {
    /// SCPI error number, `0` for no error
    pub code: i32,
    /// Error text without the surrounding quotes
    pub message: String,
}

impl InstrumentError {
    /// `0` means the queue is empty
    pub fn is_error(&self) -> bool {
        self.code != 0
    }
}

/// Session with one analyzer.
///
/// Owns the endpoint exclusively; methods take `&mut self`, so one caller at a
/// time drives the instrument.
pub struct FieldFoxSession<E: ScpiEndpoint> {
    endpoint: E,
    settings: SessionSettings,
    mode: Option<AnalyzerMode>,
    identity: Option<String>,
    last_max_power: Option<f64>,
}

impl<E: ScpiEndpoint> FieldFoxSession<E> {
    /// Take ownership of an open endpoint and run spectrum setup
    ///
    /// # Errors
    /// Any error of [`configure_spectrum_mode`](Self::configure_spectrum_mode)
    pub async fn open(endpoint: E, settings: SessionSettings) -> FieldFoxResult<Self> {
        info!("Opening FieldFox session on {}", endpoint.describe());
        let mut session = Self {
            endpoint,
            settings,
            mode: None,
            identity: None,
            last_max_power: None,
        };
        session.configure_spectrum_mode().await?;
        Ok(session)
    }

    /// Query `*IDN?` and remember the answer
    pub async fn identify(&mut self) -> FieldFoxResult<String> {
        let idn = self.endpoint.query(IDENTIFY).await?;
        info!("Connected to: {}", idn);
        self.identity = Some(idn.clone());
        Ok(idn)
    }

    /// Switch to spectrum analyzer mode and set up the sweep
    ///
    /// With `debug` set, pushes sweep points, center, span, a 20 Hz
    /// resolution bandwidth and 15 dB/div scale. Always reads the point count
    /// back, since the instrument may clamp the request.
    pub async fn configure_spectrum_mode(&mut self) -> FieldFoxResult<()> {
        self.identify().await?;
        self.select_mode(SELECT_SPECTRUM_MODE).await?;

        if self.settings.debug {
            let commands = [
                format!("SENS:SWE:POIN {}", self.settings.num_points),
                format!("SENS:FREQ:CENT {}", self.settings.center_frequency),
                format!("SENS:FREQ:SPAN {}", self.settings.span),
                format!("SENS:BAND:RES {}", RESOLUTION_BANDWIDTH),
                format!("DISP:WIND:TRAC1:Y:PDIV {}", SCALE_PER_DIVISION),
            ];
            for cmd in &commands {
                self.endpoint.write(cmd).await?;
            }
        } else {
            let center = self.endpoint.query(CENTER_FREQUENCY_QUERY).await?;
            self.settings.center_frequency = parse_real(CENTER_FREQUENCY_QUERY, &center)?;
            let span = self.endpoint.query(SPAN_QUERY).await?;
            self.settings.span = parse_real(SPAN_QUERY, &span)?;
        }

        let reply = self.endpoint.query(SWEEP_POINTS_QUERY).await?;
        let reported = parse_count(SWEEP_POINTS_QUERY, &reply)?;
        if self.settings.debug && reported != self.settings.num_points {
            warn!(
                "Instrument adjusted sweep points from {} to {}",
                self.settings.num_points, reported
            );
        }
        self.settings.num_points = reported;
        info!("Number of trace points {}", reported);

        self.mode = Some(AnalyzerMode::SpectrumAnalyzer);
        Ok(())
    }

    /// Switch to network analyzer mode showing the phase of all four
    /// S-parameters on a 2x2 split between 950 MHz and 1050 MHz
    pub async fn configure_network_analyzer_mode(&mut self) -> FieldFoxResult<()> {
        self.identify().await?;
        self.select_mode(SELECT_NETWORK_MODE).await?;

        for cmd in NETWORK_SETUP {
            self.endpoint.write(cmd).await?;
        }

        for (slot, name) in S_PARAMETER_SLOTS {
            debug!("Configuring {} phase display in slot {}", name, slot);
            self.endpoint.write(&format!("CALC:PAR{}:SEL", slot)).await?;
            self.endpoint.write("CALC:FORMat PHASe").await?;
            self.endpoint
                .write(&format!("DISPlay:WINDow:TRAC{}:Y:AUTO", slot))
                .await?;
        }

        self.mode = Some(AnalyzerMode::NetworkAnalyzer);
        Ok(())
    }

    /// Have the instrument store its current display as `<file_name>.s2p`
    ///
    /// The instrument gives no reply; a rejected file name goes unnoticed
    /// unless the caller checks [`query_error`](Self::query_error).
    pub async fn save_trace(&mut self, file_name: &str) -> FieldFoxResult<()> {
        self.endpoint
            .write(&format!("MMEM:STOR:SNP \"{}.s2p\"", file_name))
            .await?;
        info!("Save completed as: {}", file_name);
        Ok(())
    }

    /// Peak search with marker 1, cross-checked against the full trace
    pub async fn maximum_power_reading(&mut self) -> FieldFoxResult<PowerReading> {
        if self.mode == Some(AnalyzerMode::NetworkAnalyzer) {
            warn!("Reading maximum power while in network analyzer mode");
        }

        self.endpoint.write(MARKER_TO_MAX).await?;
        let reply = self.endpoint.query(MARKER_VALUE_QUERY).await?;
        let marker_dbm = parse_real(MARKER_VALUE_QUERY, &reply)?;

        let (amplitudes, raw) = self.read_amplitudes().await?;
        let trace_max_dbm =
            max_value(&amplitudes).ok_or_else(|| FieldFoxError::parse(TRACE_DATA_QUERY, &raw))?;

        if (marker_dbm - trace_max_dbm).abs() > 0.01 {
            debug!(
                "Marker {} dBm differs from trace maximum {} dBm",
                marker_dbm, trace_max_dbm
            );
        }

        self.last_max_power = Some(trace_max_dbm);
        Ok(PowerReading {
            marker_dbm,
            trace_max_dbm,
            timestamp: Utc::now(),
        })
    }

    /// Maximum power of the current trace in dBm
    ///
    /// Also stored as [`last_max_power`](Self::last_max_power).
    pub async fn maximum_power(&mut self) -> FieldFoxResult<f64> {
        Ok(self.maximum_power_reading().await?.trace_max_dbm)
    }

    /// Read trace 1 together with its stimulus axis
    ///
    /// # Errors
    /// - `Parse` if any value is not a number
    /// - `TraceLength` if the point count differs from the reported sweep points
    pub async fn trace(&mut self) -> FieldFoxResult<Trace> {
        let (amplitudes, _) = self.read_amplitudes().await?;

        let expected = self.settings.num_points as usize;
        if amplitudes.len() != expected {
            return Err(FieldFoxError::TraceLength {
                expected,
                actual: amplitudes.len(),
            });
        }

        let frequencies = stimulus_axis(
            self.settings.center_frequency,
            self.settings.span,
            expected,
        );
        Ok(Trace {
            frequencies,
            amplitudes,
        })
    }

    /// Pass a raw command through, reading a reply only for queries
    ///
    /// Commands ending in `?` are treated as queries.
    pub async fn command(&mut self, cmd: &str) -> FieldFoxResult<Option<String>> {
        if cmd.trim().ends_with('?') {
            Ok(Some(self.endpoint.query(cmd.trim()).await?))
        } else {
            self.endpoint.write(cmd.trim()).await?;
            Ok(None)
        }
    }

    /// Pop one entry from the instrument's error queue
    pub async fn query_error(&mut self) -> FieldFoxResult<InstrumentError> {
        let reply = self.endpoint.query(ERROR_QUERY).await?;
        let (code, message) = reply
            .split_once(',')
            .ok_or_else(|| FieldFoxError::parse(ERROR_QUERY, &reply))?;
        let code = code
            .trim()
            .parse::<i32>()
            .map_err(|_| FieldFoxError::parse(ERROR_QUERY, &reply))?;

        Ok(InstrumentError {
            code,
            message: message.trim().trim_matches('"').to_string(),
        })
    }

    /// Close the connection, consuming the session
    pub async fn close(self) -> FieldFoxResult<()> {
        info!("Closing FieldFox session on {}", self.endpoint.describe());
        self.endpoint.disconnect().await
    }

    /// Mode selected by the last successful configure operation
    pub fn mode(&self) -> Option<AnalyzerMode> {
        self.mode
    }

    /// Current sweep settings
    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Sweep point count as last reported by the instrument
    pub fn num_points(&self) -> u32 {
        self.settings.num_points
    }

    /// `*IDN?` reply from the last setup
    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    /// Result of the last maximum power measurement
    pub fn last_max_power(&self) -> Option<f64> {
        self.last_max_power
    }

    /// Underlying endpoint
    pub fn endpoint(&self) -> &E {
        &self.endpoint
    }

    async fn select_mode(&mut self, select: &str) -> FieldFoxResult<()> {
        let ack = self.endpoint.query(select).await?;
        if ack.trim() != "1" {
            warn!("Unexpected operation complete reply to '{}': {:?}", select, ack);
        }
        Ok(())
    }

    async fn read_amplitudes(&mut self) -> FieldFoxResult<(Vec<f64>, String)> {
        let raw = self.endpoint.query(TRACE_DATA_QUERY).await?;
        let values = parse_real_list(TRACE_DATA_QUERY, &raw)?;
        Ok((values, raw))
    }
}

impl FieldFoxSession<TcpScpiAdapter> {
    /// Open the instrument's SCPI socket and run spectrum setup
    ///
    /// # Errors
    /// - `Connection` if the instrument is unreachable
    /// - Any error of [`configure_spectrum_mode`](Self::configure_spectrum_mode)
    pub async fn connect(
        instrument: &InstrumentConfig,
        settings: SessionSettings,
    ) -> FieldFoxResult<Self> {
        let adapter = TcpScpiAdapterBuilder::new(instrument.resource.as_str())
            .with_default_port(instrument.port)
            .with_timeout(instrument.timeout())
            .connect()
            .await?;
        Self::open(adapter, settings).await
    }
}
