//! # Recorder Interface
//!
//! The shim reports what it observes through four notifications. A recorder
//! decides what to keep and where to write it; the shim only guarantees the
//! order of notifications relative to the forwarded host call:
//!
//! | Hook              | Notification        | Order                  |
//! |-------------------|---------------------|------------------------|
//! | Stepping          | [`Recorder::on_step`]          | before forwarding |
//! | FinishEvent       | [`Recorder::on_event_flush`]   | before forwarding |
//! | ConstructGeometry | [`Recorder::on_logger_init`]   | after forwarding  |
//! | Field             | [`Recorder::on_field_sample`]  | after forwarding  |
//!
//! Notifications are infallible by signature. Implementations must absorb
//! their own failures (drop the record, report via `log`) and must be safe
//! to call concurrently when the host steps on several threads.

pub mod sink;
pub mod step_logger;

pub use sink::TraceSink;
pub use step_logger::{LoggerLifecycleState, StepLogger};

/// Receiver of shim observations
pub trait Recorder: Send + Sync {
    /// One host step happened
    fn on_step(&self);

    /// The host finished an event; emit everything buffered for it
    fn on_event_flush(&self);

    /// The host evaluated the field at `point` and obtained `field`
    fn on_field_sample(&self, point: [f64; 3], field: [f64; 3]);

    /// The host finished constructing its geometry
    fn on_logger_init(&self);
}

impl<R: Recorder + ?Sized> Recorder for std::sync::Arc<R> {
    fn on_step(&self) {
        (**self).on_step();
    }

    fn on_event_flush(&self) {
        (**self).on_event_flush();
    }

    fn on_field_sample(&self, point: [f64; 3], field: [f64; 3]) {
        (**self).on_field_sample(point, field);
    }

    fn on_logger_init(&self) {
        (**self).on_logger_init();
    }
}
