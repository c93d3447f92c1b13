//! Trace data and SCPI reply parsing.

use crate::error::{FieldFoxError, FieldFoxResult};
use serde::Serialize;

/// One sweep read from the analyzer.
///
/// `frequencies` is the stimulus axis in Hz, `amplitudes` the trace values in
/// the display unit (dBm in spectrum mode). Both always have the same length.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trace {
    /// Stimulus axis in Hz
    pub frequencies: Vec<f64>,
    /// Trace values, one per frequency
    pub amplitudes: Vec<f64>,
}

impl Trace {
    /// Number of points
    pub fn len(&self) -> usize {
        self.amplitudes.len()
    }

    /// True when the trace has no points
    pub fn is_empty(&self) -> bool {
        self.amplitudes.is_empty()
    }

    /// Largest amplitude, `None` for an empty trace
    pub fn max_amplitude(&self) -> Option<f64> {
        max_value(&self.amplitudes)
    }

    /// (frequency, amplitude) pairs
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.frequencies
            .iter()
            .copied()
            .zip(self.amplitudes.iter().copied())
    }
}

/// `count` evenly spaced values from `start` to `stop` inclusive.
///
/// A single point sits at `start`; zero points give an empty axis.
pub fn linspace(start: f64, stop: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (count - 1) as f64;
            (0..count)
                .map(|i| {
                    if i == count - 1 {
                        stop
                    } else {
                        start + step * i as f64
                    }
                })
                .collect()
        }
    }
}

/// Stimulus axis for a sweep centered on `center` over `span`.
pub fn stimulus_axis(center: f64, span: f64, count: usize) -> Vec<f64> {
    linspace(center - span / 2.0, center + span / 2.0, count)
}

/// Parse a single numeric reply such as `-2.35000000E+001`.
///
/// Like [`parse_real_list`], `nan` and `inf` tokens parse as floats.
pub fn parse_real(command: &str, reply: &str) -> FieldFoxResult<f64> {
    reply
        .trim()
        .parse::<f64>()
        .map_err(|_| FieldFoxError::parse(command, reply))
}

/// Parse a comma separated list of reals. Any bad token fails the whole reply.
///
/// Tokens follow Rust float syntax, so `nan`, `inf` and `infinity` (any case,
/// optionally signed) are accepted as values rather than rejected.
pub fn parse_real_list(command: &str, reply: &str) -> FieldFoxResult<Vec<f64>> {
    let reply = reply.trim();
    if reply.is_empty() {
        return Ok(Vec::new());
    }
    reply
        .split(',')
        .map(|token| {
            token
                .trim()
                .parse::<f64>()
                .map_err(|_| FieldFoxError::parse(command, reply))
        })
        .collect()
}

/// Parse a point count. Accepts `401`, `+401` and `4.01E+02`.
pub fn parse_count(command: &str, reply: &str) -> FieldFoxResult<u32> {
    let trimmed = reply.trim();
    let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);
    if let Ok(count) = digits.parse::<u32>() {
        return Ok(count);
    }

    match trimmed.parse::<f64>() {
        Ok(value) if value >= 0.0 && value.fract() == 0.0 && value <= u32::MAX as f64 => {
            Ok(value as u32)
        }
        _ => Err(FieldFoxError::parse(command, reply)),
    }
}

pub(crate) fn max_value(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::max)
}
