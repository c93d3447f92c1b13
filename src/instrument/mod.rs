//! Analyzer driver.
//!
//! `fieldfox` holds the session that speaks the analyzer's SCPI dialect;
//! `trace` holds the sweep data type and the reply parsers it relies on.

pub mod fieldfox;
pub mod trace;

pub use fieldfox::{
    AnalyzerMode, FieldFoxSession, InstrumentError, PowerReading, SessionSettings,
    S_PARAMETER_SLOTS,
};
pub use trace::{linspace, stimulus_axis, Trace};
