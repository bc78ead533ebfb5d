use mcstep::analysis::summarize;
use mcstep::export::ChromeTraceExporter;
use mcstep::trace_data::TraceData;
use mcstep_common::EventId;
use mcstep_intercept::config::StepLoggerConfig;
use mcstep_intercept::{Recorder, StepLogger};

/// Drive a step logger the way a host would and return the trace path
fn record_trace(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("steps.jsonl");
    let logger = StepLogger::new(StepLoggerConfig {
        output: Some(path.clone()),
        field_samples: true,
        max_samples: 2,
    });

    logger.on_logger_init();
    for event in 0..3u32 {
        for _ in 0..(10 * (event + 1)) {
            logger.on_step();
        }
        logger.on_field_sample([0.0, 0.0, f64::from(event)], [0.0, 0.0, f64::from(event) + 0.5]);
        logger.on_event_flush();
    }
    path
}

#[test]
fn test_logger_output_loads_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = record_trace(dir.path());

    let data = TraceData::load(&path).expect("Failed to load trace");
    let session = data.session.as_ref().expect("Missing session header");
    assert_eq!(session.pid, std::process::id());
    assert!(session.field_samples);
    assert_eq!(data.malformed, 0);

    let steps: Vec<u64> = data.events.iter().map(|e| e.steps).collect();
    assert_eq!(steps, vec![10, 20, 30]);
    assert_eq!(data.events[2].samples.len(), 1);

    let summary = summarize(&data);
    assert_eq!(summary.events, 3);
    assert_eq!(summary.total_steps, 60);
    assert_eq!(summary.total_field_calls, 3);
    assert_eq!(summary.busiest_event, Some((EventId(2), 30)));
    assert_eq!(summary.max_field_magnitude, Some(2.5));
}

#[test]
fn test_export_creates_valid_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = record_trace(dir.path());
    let data = TraceData::load(&path).unwrap();

    let exporter = ChromeTraceExporter::from_trace(&data);
    let mut buffer = Vec::new();
    exporter.export(&mut buffer).expect("Failed to export trace");

    let json_str = String::from_utf8(buffer).expect("Invalid UTF-8");
    let parsed: serde_json::Value = serde_json::from_str(&json_str).expect("Invalid JSON");

    assert_eq!(parsed["displayTimeUnit"], "ms");
    let events = parsed["traceEvents"].as_array().unwrap();
    assert_eq!(events.iter().filter(|e| e["ph"] == "X").count(), 3);
    assert_eq!(events.iter().filter(|e| e["ph"] == "C").count(), 6);

    // Spans follow each other without overlap
    let spans: Vec<(f64, f64)> = events
        .iter()
        .filter(|e| e["ph"] == "X")
        .map(|e| (e["ts"].as_f64().unwrap(), e["dur"].as_f64().unwrap()))
        .collect();
    for pair in spans.windows(2) {
        assert!(pair[1].0 >= pair[0].0 + pair[0].1 - f64::EPSILON);
    }
}
