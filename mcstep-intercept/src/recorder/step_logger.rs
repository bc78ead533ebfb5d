//! # Step Logger
//!
//! The bundled [`Recorder`]: counts steps and field evaluations per event and
//! emits one [`EventSummary`] whenever the host finishes an event.
//!
//! ## Lifecycle
//!
//! ```text
//! Uninitialized ──on_logger_init()──▶ Initialized
//! ```
//!
//! The transition happens once, after the host constructed its geometry.
//! Counting works in both phases. An event flushed while still
//! uninitialized is logged but not written to the trace file (the file is
//! only opened at initialization); a warning is issued the first time.
//!
//! ## Concurrency
//!
//! Counters are atomics so stepping hooks on several host threads never
//! contend on a lock. A flush takes the counters with `swap`, so a step that
//! races with the flush lands in exactly one of the two events.

use log::{debug, info, warn};
use mcstep_common::{EventId, EventSummary, FieldSample, SessionInfo, TraceRecord};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use super::{Recorder, TraceSink};
use crate::config::StepLoggerConfig;

/// Logger lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggerLifecycleState {
    Uninitialized,
    Initialized,
}

/// Per-event step and field counter
pub struct StepLogger {
    config: StepLoggerConfig,
    /// Set exactly once by `on_logger_init`
    initialized_at: OnceLock<Instant>,
    steps: AtomicU64,
    field_calls: AtomicU64,
    /// Bit pattern of the largest non-negative field magnitude this event
    max_field_bits: AtomicU64,
    next_event: AtomicU64,
    samples: Mutex<Vec<FieldSample>>,
    sink: Mutex<Option<TraceSink>>,
    warned_uninitialized: AtomicBool,
}

impl StepLogger {
    #[must_use]
    pub fn new(config: StepLoggerConfig) -> Self {
        Self {
            config,
            initialized_at: OnceLock::new(),
            steps: AtomicU64::new(0),
            field_calls: AtomicU64::new(0),
            max_field_bits: AtomicU64::new(0),
            next_event: AtomicU64::new(0),
            samples: Mutex::new(Vec::new()),
            sink: Mutex::new(None),
            warned_uninitialized: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn phase(&self) -> LoggerLifecycleState {
        if self.initialized_at.get().is_some() {
            LoggerLifecycleState::Initialized
        } else {
            LoggerLifecycleState::Uninitialized
        }
    }

    #[must_use]
    pub fn config(&self) -> &StepLoggerConfig {
        &self.config
    }

    /// Steps counted since the last flush
    #[must_use]
    pub fn pending_steps(&self) -> u64 {
        self.steps.load(Ordering::Relaxed)
    }

    /// Field evaluations counted since the last flush
    #[must_use]
    pub fn pending_field_calls(&self) -> u64 {
        self.field_calls.load(Ordering::Relaxed)
    }

    /// Close the current event and emit its summary
    ///
    /// Returns the summary that was logged (and written, when a trace file
    /// is open).
    pub fn flush_event(&self) -> EventSummary {
        let steps = self.steps.swap(0, Ordering::AcqRel);
        let field_calls = self.field_calls.swap(0, Ordering::AcqRel);
        let max_bits = self.max_field_bits.swap(0, Ordering::AcqRel);
        let samples = std::mem::take(&mut *lock(&self.samples));
        let event = EventId(self.next_event.fetch_add(1, Ordering::Relaxed));

        let elapsed_us = self
            .initialized_at
            .get()
            .map_or(0, |start| u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX));

        let summary = EventSummary {
            event,
            steps,
            field_calls,
            max_field_magnitude: (field_calls > 0).then(|| f64::from_bits(max_bits)),
            elapsed_us,
            samples,
        };

        info!("[STEPLOGGER] {event}: {steps} steps, {field_calls} field calls");

        if self.phase() == LoggerLifecycleState::Uninitialized {
            if !self.warned_uninitialized.swap(true, Ordering::Relaxed) {
                warn!(
                    "[STEPLOGGER] {event} finished before geometry construction; \
                     summaries are not written to the trace until the logger initializes"
                );
            }
            return summary;
        }

        self.write(&TraceRecord::Event(summary.clone()), event);
        summary
    }

    fn write(&self, record: &TraceRecord, event: EventId) {
        let mut sink = lock(&self.sink);
        if let Some(sink) = sink.as_mut() {
            if let Err(e) = sink.write(record) {
                warn!("[STEPLOGGER] Dropping record for {event}: {e}");
            }
        }
    }

    fn open_sink(&self) {
        let Some(path) = self.config.output.as_ref() else {
            info!("[STEPLOGGER] No trace file configured, summaries go to the log only");
            return;
        };

        let mut sink = match TraceSink::create(path) {
            Ok(sink) => sink,
            Err(e) => {
                warn!("[STEPLOGGER] {e}; continuing without trace file");
                return;
            }
        };

        let session = TraceRecord::Session(SessionInfo {
            pid: std::process::id(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_unix_ms: unix_millis(),
            field_samples: self.config.field_samples,
            max_samples: self.config.max_samples,
        });
        if let Err(e) = sink.write(&session) {
            warn!("[STEPLOGGER] Failed to write session header: {e}");
        }

        info!("[STEPLOGGER] Writing step trace to {}", sink.path().display());
        *lock(&self.sink) = Some(sink);
    }
}

impl Recorder for StepLogger {
    fn on_step(&self) {
        self.steps.fetch_add(1, Ordering::Relaxed);
    }

    fn on_event_flush(&self) {
        self.flush_event();
    }

    fn on_field_sample(&self, point: [f64; 3], field: [f64; 3]) {
        self.field_calls.fetch_add(1, Ordering::Relaxed);

        let sample = FieldSample { point, field };
        let magnitude = sample.magnitude();
        // Non-negative finite f64 values order the same as their bit patterns.
        if magnitude.is_finite() {
            self.max_field_bits.fetch_max(magnitude.to_bits(), Ordering::Relaxed);
        }

        if self.config.field_samples {
            let mut samples = lock(&self.samples);
            if samples.len() < self.config.max_samples {
                samples.push(sample);
            }
        }
    }

    fn on_logger_init(&self) {
        let mut first = false;
        self.initialized_at.get_or_init(|| {
            first = true;
            Instant::now()
        });

        if first {
            info!("[STEPLOGGER] Initialized (pid {})", std::process::id());
            self.open_sink();
        } else {
            debug!("[STEPLOGGER] Already initialized, ignoring repeated geometry construction");
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}
