//! Core library for the FieldFox control panel.
//!
//! A SCPI driver for Keysight FieldFox analyzers and the control panel layer
//! built on it. The session ([`instrument::FieldFoxSession`]) owns one
//! connection to the analyzer and turns spectrum/network analyzer setup,
//! peak power, trace reads and `.s2p` saves into SCPI exchanges. The panel
//! ([`panel::CommandPanel`]) maps a grid of labelled slots onto those
//! operations for whatever front end drives it.

pub mod adapters;
pub mod config;
pub mod error;
pub mod hardware;
pub mod instrument;
pub mod panel;
pub mod traits;

pub use error::{FieldFoxError, FieldFoxResult};
pub use instrument::{AnalyzerMode, FieldFoxSession, SessionSettings, Trace};
pub use traits::ScpiEndpoint;
