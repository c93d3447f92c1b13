//! FieldFox session integration tests
//!
//! Drives the session against the scripted mock endpoint and checks the
//! exchanges and parsed results.

use fieldfox_panel::adapters::{MockScpiEndpoint, ScpiCall};
use fieldfox_panel::instrument::{AnalyzerMode, FieldFoxSession, SessionSettings};
use fieldfox_panel::FieldFoxError;

const CENTER: f64 = 2.45e9;
const SPAN: f64 = 50.0e6;

async fn open(mock: &MockScpiEndpoint) -> FieldFoxSession<MockScpiEndpoint> {
    FieldFoxSession::open(mock.clone(), SessionSettings::new(CENTER, SPAN))
        .await
        .expect("session should open")
}

/// Trace and stimulus axis have the reported length and span the sweep
#[tokio::test]
async fn test_trace_matches_reported_points() {
    let mock = MockScpiEndpoint::fieldfox(401, -30.0);
    let mut session = open(&mock).await;

    let trace = session.trace().await.unwrap();
    assert_eq!(trace.amplitudes.len(), 401);
    assert_eq!(trace.frequencies.len(), 401);

    let first = trace.frequencies[0];
    let last = trace.frequencies[400];
    assert!((first - (CENTER - SPAN / 2.0)).abs() < 1e-3);
    assert!((last - (CENTER + SPAN / 2.0)).abs() < 1e-3);
    assert!(trace.frequencies.windows(2).all(|w| w[1] > w[0]));

    let step = trace.frequencies[1] - trace.frequencies[0];
    assert!(trace
        .frequencies
        .windows(2)
        .all(|w| ((w[1] - w[0]) - step).abs() < 1e-3));
}

/// Maximum power equals the maximum of the same trace snapshot
#[tokio::test]
async fn test_maximum_power_equals_trace_max() {
    let trace = "-80.0,-41.25,-12.5,-60.0,-75.5";
    let mock = MockScpiEndpoint::fieldfox(5, -12.5).with_response("TRAC1:DATA?", trace);
    let mut session = open(&mock).await;

    let power = session.maximum_power().await.unwrap();
    let amplitudes = session.trace().await.unwrap().amplitudes;
    let max = amplitudes.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    assert!((power - max).abs() < 1e-9);
    assert_eq!(session.last_max_power(), Some(power));
}

/// Peak search command precedes the marker and trace queries
#[tokio::test]
async fn test_maximum_power_exchange_order() {
    let mock = MockScpiEndpoint::fieldfox(401, -23.5);
    let mut session = open(&mock).await;
    mock.clear_log();

    let reading = session.maximum_power_reading().await.unwrap();
    assert_eq!(reading.marker_dbm, -23.5);
    assert_eq!(reading.trace_max_dbm, -23.5);
    assert_eq!(
        mock.call_log(),
        vec![
            ScpiCall::Write("CALC:MARK1:FUNC:MAX".to_string()),
            ScpiCall::Query("CALC:MARK1:Y?".to_string()),
            ScpiCall::Query("TRAC1:DATA?".to_string()),
        ]
    );
}

/// The instrument's point count wins over the requested one
#[tokio::test]
async fn test_setup_keeps_clamped_point_count() {
    let mock = MockScpiEndpoint::fieldfox(1001, -30.0);
    let session = FieldFoxSession::open(
        mock.clone(),
        SessionSettings::new(CENTER, SPAN).with_num_points(20001),
    )
    .await
    .unwrap();

    assert!(mock.writes().contains(&"SENS:SWE:POIN 20001".to_string()));
    assert_eq!(session.num_points(), 1001);
}

/// Re-running setup reads the count again
#[tokio::test]
async fn test_setup_rereads_point_count() {
    let mock = MockScpiEndpoint::fieldfox(401, -30.0);
    let mut session = open(&mock).await;

    mock.push_response("SENS:SWE:POIN?", "201");
    session.configure_spectrum_mode().await.unwrap();
    assert_eq!(session.num_points(), 201);
}

#[tokio::test]
async fn test_save_trace_filename_is_quoted_with_extension() {
    let mock = MockScpiEndpoint::fieldfox(401, -30.0);
    let mut session = open(&mock).await;
    mock.clear_log();

    session.save_trace("foo").await.unwrap();
    assert_eq!(
        mock.call_log(),
        vec![ScpiCall::Write("MMEM:STOR:SNP \"foo.s2p\"".to_string())]
    );
}

#[tokio::test]
async fn test_malformed_trace_is_a_parse_error() {
    let mock = MockScpiEndpoint::fieldfox(3, -30.0).with_response("TRAC1:DATA?", "1.2,abc,3.4");
    let mut session = open(&mock).await;

    let err = session.trace().await.unwrap_err();
    assert!(matches!(err, FieldFoxError::Parse { .. }), "got {err:?}");

    let err = session.maximum_power().await.unwrap_err();
    assert!(matches!(err, FieldFoxError::Parse { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_short_trace_is_rejected() {
    let mock = MockScpiEndpoint::fieldfox(401, -30.0).with_response("TRAC1:DATA?", "-1.0,-2.0");
    let mut session = open(&mock).await;

    match session.trace().await {
        Err(FieldFoxError::TraceLength { expected, actual }) => {
            assert_eq!(expected, 401);
            assert_eq!(actual, 2);
        }
        other => panic!("expected TraceLength, got {other:?}"),
    }
}

/// Four select/format/autoscale triplets in S11, S21, S12, S22 order
#[tokio::test]
async fn test_network_analyzer_setup_sequence() {
    let mock = MockScpiEndpoint::fieldfox(401, -30.0);
    let mut session = open(&mock).await;
    mock.clear_log();

    session.configure_network_analyzer_mode().await.unwrap();
    assert_eq!(session.mode(), Some(AnalyzerMode::NetworkAnalyzer));

    let commands = mock.commands();
    assert_eq!(
        &commands[..6],
        &[
            "*IDN?",
            "INST:SEL 'NA';*OPC?",
            ":DISP:WIND:SPL D12_34",
            "FREQ:STAR 950e6",
            "FREQ:STOP 1050e6",
            "CORR 1",
        ]
    );

    let triplets: Vec<&[String]> = commands[6..].chunks(3).collect();
    assert_eq!(triplets.len(), 4);
    for (i, triplet) in triplets.iter().enumerate() {
        let slot = i + 1;
        assert_eq!(triplet[0], format!("CALC:PAR{}:SEL", slot));
        assert_eq!(triplet[1], "CALC:FORMat PHASe");
        assert_eq!(triplet[2], format!("DISPlay:WINDow:TRAC{}:Y:AUTO", slot));
    }
}

#[tokio::test]
async fn test_mode_follows_configure_operations() {
    let mock = MockScpiEndpoint::fieldfox(401, -30.0);
    let mut session = open(&mock).await;
    assert_eq!(session.mode(), Some(AnalyzerMode::SpectrumAnalyzer));

    session.configure_network_analyzer_mode().await.unwrap();
    assert_eq!(session.mode(), Some(AnalyzerMode::NetworkAnalyzer));

    session.configure_spectrum_mode().await.unwrap();
    assert_eq!(session.mode(), Some(AnalyzerMode::SpectrumAnalyzer));
}

/// A failed configure leaves the previous mode in place
#[tokio::test]
async fn test_failed_configure_keeps_mode() {
    let mock = MockScpiEndpoint::fieldfox(401, -30.0);
    let mut session = open(&mock).await;

    mock.inject_next_failure();
    let err = session.configure_network_analyzer_mode().await.unwrap_err();
    assert!(err.is_connection());
    assert_eq!(session.mode(), Some(AnalyzerMode::SpectrumAnalyzer));
}

#[tokio::test]
async fn test_dropped_connection_surfaces() {
    let mock = MockScpiEndpoint::fieldfox(401, -30.0);
    let mut session = open(&mock).await;

    mock.inject_next_failure();
    assert!(session.trace().await.unwrap_err().is_connection());
    // No retry happened: only the one failed query was attempted
    assert_eq!(
        mock.call_log().last(),
        Some(&ScpiCall::Query("TRAC1:DATA?".to_string()))
    );
}
