//! Analysis logic for recorded traces
//!
//! Pure aggregation over [`TraceData`], separated from the printing done by
//! the `report` subcommand.

use crate::trace_data::TraceData;
use mcstep_common::EventId;

/// Totals across every event of a trace
#[derive(Debug, Clone, PartialEq)]
pub struct TraceSummary {
    pub events: usize,
    pub total_steps: u64,
    pub total_field_calls: u64,
    /// Mean steps per event (0 without events)
    pub mean_steps: f64,
    /// Event with the most steps, and its step count
    pub busiest_event: Option<(EventId, u64)>,
    /// Largest field magnitude over all events
    pub max_field_magnitude: Option<f64>,
    pub duration_us: u64,
    pub malformed_lines: usize,
}

/// Aggregate a loaded trace
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn summarize(data: &TraceData) -> TraceSummary {
    let total_steps: u64 = data.events.iter().map(|e| e.steps).sum();
    let total_field_calls: u64 = data.events.iter().map(|e| e.field_calls).sum();

    let busiest_event = data
        .events
        .iter()
        .max_by_key(|e| (e.steps, std::cmp::Reverse(e.event)))
        .map(|e| (e.event, e.steps));

    let max_field_magnitude = data
        .events
        .iter()
        .filter_map(|e| e.max_field_magnitude)
        .fold(None, |acc: Option<f64>, m| Some(acc.map_or(m, |a| a.max(m))));

    let mean_steps = if data.events.is_empty() {
        0.0
    } else {
        total_steps as f64 / data.events.len() as f64
    };

    TraceSummary {
        events: data.events.len(),
        total_steps,
        total_field_calls,
        mean_steps,
        busiest_event,
        max_field_magnitude,
        duration_us: data.duration_us(),
        malformed_lines: data.malformed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcstep_common::EventSummary;

    fn event(id: u64, steps: u64, field_calls: u64, max: Option<f64>) -> EventSummary {
        EventSummary {
            event: EventId(id),
            steps,
            field_calls,
            max_field_magnitude: max,
            elapsed_us: id * 1000,
            samples: Vec::new(),
        }
    }

    #[test]
    fn test_summarize_empty() {
        let summary = summarize(&TraceData::default());
        assert_eq!(summary.events, 0);
        assert!(summary.mean_steps.abs() < f64::EPSILON);
        assert!(summary.busiest_event.is_none());
        assert!(summary.max_field_magnitude.is_none());
    }

    #[test]
    fn test_summarize_totals() {
        let data = TraceData {
            session: None,
            events: vec![
                event(0, 10, 2, Some(0.5)),
                event(1, 30, 0, None),
                event(2, 30, 5, Some(2.0)),
            ],
            malformed: 1,
        };
        let summary = summarize(&data);

        assert_eq!(summary.total_steps, 70);
        assert_eq!(summary.total_field_calls, 7);
        assert!((summary.mean_steps - 70.0 / 3.0).abs() < 1e-9);
        // Ties go to the earlier event
        assert_eq!(summary.busiest_event, Some((EventId(1), 30)));
        assert_eq!(summary.max_field_magnitude, Some(2.0));
        assert_eq!(summary.duration_us, 2000);
        assert_eq!(summary.malformed_lines, 1);
    }
}
