//! Spreadsheet exports of panel results.
//!
//! `export_column` writes one value per row with no header, which pastes
//! straight into a single spreadsheet column. `export_trace` writes a two
//! column table with a header row.

use crate::error::FieldFoxResult;
use crate::instrument::Trace;
use serde::Serialize;
use std::io;

#[derive(Serialize)]
struct TraceRow {
    frequency_hz: f64,
    amplitude: f64,
}

/// Write `values` as a single headerless column
pub fn export_column<W: io::Write>(values: &[f64], writer: W) -> FieldFoxResult<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    for value in values {
        wtr.write_record([value.to_string()])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write a trace as `frequency_hz,amplitude` rows
pub fn export_trace<W: io::Write>(trace: &Trace, writer: W) -> FieldFoxResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for (frequency_hz, amplitude) in trace.points() {
        wtr.serialize(TraceRow {
            frequency_hz,
            amplitude,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_column() {
        let mut out = Vec::new();
        export_column(&[-23.46, -40.0], &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "-23.46\n-40\n");
    }

    #[test]
    fn test_export_column_empty() {
        let mut out = Vec::new();
        export_column(&[], &mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_export_trace() {
        let trace = Trace {
            frequencies: vec![950000000.0, 1050000000.0],
            amplitudes: vec![-80.5, -12.0],
        };
        let mut out = Vec::new();
        export_trace(&trace, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "frequency_hz,amplitude\n950000000.0,-80.5\n1050000000.0,-12.0\n"
        );
    }
}
