use anyhow::{Context, Result};
use mcstep_common::EventSummary;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::io::Write;

use crate::trace_data::TraceData;

/// Chrome Trace Event format
/// Spec: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU/preview
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChromeTraceEvent {
    name: String,
    cat: String,
    /// Phase: "X" = complete, "C" = counter, "M" = metadata
    ph: String,
    /// Timestamp in microseconds
    ts: f64,
    /// Duration in microseconds ("X" events only)
    #[serde(skip_serializing_if = "Option::is_none")]
    dur: Option<f64>,
    pid: u32,
    tid: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    args: Option<BTreeMap<String, JsonValue>>,
}

/// Chrome Trace Format container
#[derive(Debug, Serialize)]
struct ChromeTrace {
    #[serde(rename = "traceEvents")]
    trace_events: Vec<ChromeTraceEvent>,
    #[serde(rename = "displayTimeUnit")]
    display_time_unit: String,
}

/// Chrome trace exporter for per-event timelines
///
/// Each simulated event becomes one complete span from the previous flush
/// to its own flush, with step and field-call counters sampled at the end
/// of the span.
pub struct ChromeTraceExporter {
    events: Vec<ChromeTraceEvent>,
    pid: u32,
    /// End of the previous span, in microseconds since logger init
    last_end_us: u64,
}

impl ChromeTraceExporter {
    /// Create an exporter for events of the given host process
    #[must_use]
    pub fn new(pid: u32) -> Self {
        Self { events: Vec::new(), pid, last_end_us: 0 }
    }

    /// Create an exporter holding every event of a loaded trace
    #[must_use]
    pub fn from_trace(data: &TraceData) -> Self {
        let pid = data.session.as_ref().map_or(0, |s| s.pid);
        let mut exporter = Self::new(pid);
        for event in &data.events {
            exporter.add_event(event);
        }
        exporter
    }

    /// Add one event summary to the timeline
    #[allow(clippy::cast_precision_loss)]
    pub fn add_event(&mut self, event: &EventSummary) {
        let start_us = self.last_end_us.min(event.elapsed_us);
        let end_us = event.elapsed_us;
        self.last_end_us = end_us;

        let mut args = BTreeMap::new();
        args.insert("steps".to_string(), serde_json::json!(event.steps));
        args.insert("field_calls".to_string(), serde_json::json!(event.field_calls));
        if let Some(max) = event.max_field_magnitude {
            args.insert("max_field_magnitude".to_string(), serde_json::json!(max));
        }
        if !event.samples.is_empty() {
            args.insert("samples".to_string(), serde_json::json!(event.samples.len()));
        }

        self.events.push(ChromeTraceEvent {
            name: event.event.to_string(),
            cat: "event".to_string(),
            ph: "X".to_string(),
            ts: start_us as f64,
            dur: Some((end_us - start_us) as f64),
            pid: self.pid,
            tid: 0,
            args: Some(args),
        });

        for (name, value) in [("steps", event.steps), ("field_calls", event.field_calls)] {
            let mut args = BTreeMap::new();
            args.insert(name.to_string(), serde_json::json!(value));
            self.events.push(ChromeTraceEvent {
                name: name.to_string(),
                cat: "counter".to_string(),
                ph: "C".to_string(),
                ts: end_us as f64,
                dur: None,
                pid: self.pid,
                tid: 0,
                args: Some(args),
            });
        }
    }

    /// Export the trace to any writer (file, stdout, buffer, etc.)
    ///
    /// # Errors
    /// Returns an error if writing the JSON fails
    pub fn export<W: Write>(&self, writer: W) -> Result<()> {
        let mut all_events = self.events.clone();

        let mut args = BTreeMap::new();
        args.insert("name".to_string(), serde_json::json!(format!("host {}", self.pid)));
        all_events.push(ChromeTraceEvent {
            name: "process_name".to_string(),
            cat: String::new(),
            ph: "M".to_string(),
            ts: 0.0,
            dur: None,
            pid: self.pid,
            tid: 0,
            args: Some(args),
        });

        let trace =
            ChromeTrace { trace_events: all_events, display_time_unit: "ms".to_string() };

        serde_json::to_writer_pretty(writer, &trace).context("Failed to write trace JSON")?;

        Ok(())
    }

    /// Get the number of events collected (spans and counters)
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.events.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcstep_common::EventId;

    fn summary(id: u64, steps: u64, elapsed_us: u64) -> EventSummary {
        EventSummary {
            event: EventId(id),
            steps,
            field_calls: steps / 2,
            max_field_magnitude: None,
            elapsed_us,
            samples: Vec::new(),
        }
    }

    #[test]
    fn test_spans_are_contiguous() {
        let mut exporter = ChromeTraceExporter::new(42);
        exporter.add_event(&summary(0, 10, 1000));
        exporter.add_event(&summary(1, 20, 3500));
        assert_eq!(exporter.event_count(), 6);

        let mut buffer = Vec::new();
        exporter.export(&mut buffer).unwrap();
        let json: JsonValue = serde_json::from_slice(&buffer).unwrap();
        let events = json["traceEvents"].as_array().unwrap();

        let spans: Vec<&JsonValue> = events.iter().filter(|e| e["ph"] == "X").collect();
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0]["ts"], 0.0);
        assert_eq!(spans[0]["dur"], 1000.0);
        assert_eq!(spans[1]["ts"], 1000.0);
        assert_eq!(spans[1]["dur"], 2500.0);
        assert_eq!(spans[1]["name"], "event#1");
        assert_eq!(spans[1]["pid"], 42);
    }

    #[test]
    fn test_counter_events() {
        let mut exporter = ChromeTraceExporter::new(1);
        exporter.add_event(&summary(0, 8, 200));

        let mut buffer = Vec::new();
        exporter.export(&mut buffer).unwrap();
        let json: JsonValue = serde_json::from_slice(&buffer).unwrap();
        let events = json["traceEvents"].as_array().unwrap();

        let steps = events.iter().find(|e| e["ph"] == "C" && e["name"] == "steps").unwrap();
        assert_eq!(steps["ts"], 200.0);
        assert_eq!(steps["args"]["steps"], 8);
        let field = events.iter().find(|e| e["ph"] == "C" && e["name"] == "field_calls").unwrap();
        assert_eq!(field["args"]["field_calls"], 4);
        assert!(events.iter().any(|e| e["ph"] == "M" && e["name"] == "process_name"));
        assert_eq!(json["displayTimeUnit"], "ms");
    }

    #[test]
    fn test_pre_init_flush_has_zero_duration() {
        let mut exporter = ChromeTraceExporter::new(1);
        exporter.add_event(&summary(0, 5, 0));
        exporter.add_event(&summary(1, 5, 700));

        let mut buffer = Vec::new();
        exporter.export(&mut buffer).unwrap();
        let json: JsonValue = serde_json::from_slice(&buffer).unwrap();
        let spans: Vec<JsonValue> = json["traceEvents"]
            .as_array()
            .unwrap()
            .iter()
            .filter(|e| e["ph"] == "X")
            .cloned()
            .collect();
        assert_eq!(spans[0]["dur"], 0.0);
        assert_eq!(spans[1]["ts"], 0.0);
        assert_eq!(spans[1]["dur"], 700.0);
    }
}
