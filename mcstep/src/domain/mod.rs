//! Domain model for mcstep
//!
//! Core errors plus re-exports of the record types shared with the
//! preloaded library.

pub mod errors;

pub use errors::{InspectError, TraceError};
pub use mcstep_common::{EventId, EventSummary, FieldSample, SessionInfo, TraceRecord};
