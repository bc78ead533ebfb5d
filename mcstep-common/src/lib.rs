//! # Shared Data Structures (preloaded library ↔ CLI)
//!
//! Defines the records the preloaded step logger writes and the `mcstep`
//! CLI reads back, plus the environment variable names that form the
//! configuration contract between the two. Nothing in here touches the host
//! process or any FFI.
//!
//! ## Trace File Format
//!
//! A trace is a JSON-lines file. The first line is a [`TraceRecord::Session`]
//! header written when the logger initializes (right after the host finished
//! constructing its geometry), followed by one [`TraceRecord::Event`] line per
//! simulated event:
//!
//! ```text
//! {"kind":"session","pid":4242,"version":"0.1.0","started_unix_ms":...}
//! {"kind":"event","event":0,"steps":18231,"field_calls":9120,...}
//! {"kind":"event","event":1,"steps":17002,"field_calls":8811,...}
//! ```
//!
//! ## Key Types
//!
//! - [`TraceRecord`] - One line of the trace file
//! - [`EventSummary`] - Per-event counters flushed at end of event
//! - [`FieldSample`] - One magnetic field query (point and computed vector)
//! - [`EventId`] - Zero-based event number

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Environment Contract
// ============================================================================

/// Trace output path (JSON lines). Unset means summaries go to the log only.
pub const ENV_OUTPUT: &str = "MCSTEP_OUTPUT";

/// Retain individual field samples in each event record (`1`, `true`, `yes`, `on`)
pub const ENV_FIELD_SAMPLES: &str = "MCSTEP_FIELD_SAMPLES";

/// Per-event cap on retained field samples
pub const ENV_MAX_SAMPLES: &str = "MCSTEP_MAX_SAMPLES";

/// `env_logger` filter used inside the host process
pub const ENV_LOG: &str = "MCSTEP_LOG";

/// Resolve every registered original on first hook invocation
pub const ENV_EAGER_RESOLVE: &str = "MCSTEP_EAGER_RESOLVE";

/// Default for [`ENV_MAX_SAMPLES`]
pub const DEFAULT_MAX_SAMPLES: usize = 1000;

/// Parse a boolean-ish environment value.
///
/// Returns `None` when the value is not recognised so callers can warn and
/// fall back to their default.
#[must_use]
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

// ============================================================================
// Domain Types
// ============================================================================

/// Event number within one host process (0-based, in flush order)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub u64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event#{}", self.0)
    }
}

/// One magnetic field evaluation observed by the field hook
///
/// `point` is the query position and `field` the vector the host's own
/// implementation wrote into its output buffer, both in host units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldSample {
    pub point: [f64; 3],
    pub field: [f64; 3],
}

impl FieldSample {
    /// Euclidean norm of the field vector
    #[must_use]
    pub fn magnitude(&self) -> f64 {
        self.field.iter().map(|c| c * c).sum::<f64>().sqrt()
    }
}

// ============================================================================
// Trace Records
// ============================================================================

/// Header written once per host process when the logger initializes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    /// Host process ID
    pub pid: u32,

    /// Version of the preloaded library that wrote the trace
    pub version: String,

    /// Wall clock at logger initialization (milliseconds since the Unix epoch)
    pub started_unix_ms: u64,

    /// Whether event records carry individual field samples
    pub field_samples: bool,

    /// Per-event sample cap in effect
    pub max_samples: usize,
}

/// Counters for one completed event
///
/// Built by the step logger when the host finishes an event, immediately
/// before the host's own end-of-event bookkeeping runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSummary {
    pub event: EventId,

    /// Number of stepping calls since the previous flush
    pub steps: u64,

    /// Number of field evaluations since the previous flush
    pub field_calls: u64,

    /// Largest field magnitude seen in this event (`None` without field calls)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_field_magnitude: Option<f64>,

    /// Microseconds between logger initialization and this flush
    ///
    /// Zero when the event was flushed before the logger initialized.
    pub elapsed_us: u64,

    /// Retained field samples (empty unless sampling is enabled)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub samples: Vec<FieldSample>,
}

/// One line of a trace file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraceRecord {
    Session(SessionInfo),
    Event(EventSummary),
}

impl TraceRecord {
    /// Serialize to a single JSON line (without trailing newline)
    ///
    /// # Errors
    /// Returns an error if a float field is not representable in JSON
    pub fn to_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Parse one line of a trace file
///
/// # Errors
/// Returns an error if the line is not a valid [`TraceRecord`]
pub fn parse_trace_line(line: &str) -> serde_json::Result<TraceRecord> {
    serde_json::from_str(line.trim())
}
