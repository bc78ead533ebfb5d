//! # mcstep - Step and Field Tracing for Virtual Monte Carlo Hosts
//!
//! Operator-side companion of the preloadable step logger in
//! `mcstep-intercept`. It launches a simulation host with the logger
//! preloaded, checks which host libraries the logger can attach to, and
//! reads the recorded traces back.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌───────────────────────────┐      LD_PRELOAD + MCSTEP_*      ┌──────────────────────┐
//! │  mcstep run -- o2-sim ... │ ──────────────────────────────▶ │  Host (o2-sim, ...)  │
//! │  (launcher, preflight)    │                                 │  + mcstep-intercept  │
//! └───────────────────────────┘                                 └──────────┬───────────┘
//!                                                                          │ JSON lines
//!                                                                          ▼
//! ┌───────────────────────────┐        ┌──────────────┐          ┌──────────────────────┐
//! │  mcstep report / export   │ ◀───── │  TraceData   │ ◀─────── │    steps.jsonl       │
//! │  (analysis, chrome trace) │        │  (loader)    │          │                      │
//! └───────────────────────────┘        └──────────────┘          └──────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`launcher`]: preload environment and host supervision
//! - [`preflight`]: preload library validation before launch
//! - [`inspection`]: dynamic symbol tables (`check`) and `/proc/PID/maps` (`attached`)
//! - [`trace_data`]: tolerant JSON-lines trace loader
//! - [`analysis`]: per-trace totals for `report`
//! - [`export`]: Chrome Trace Event Format for Perfetto and `chrome://tracing`
//! - [`cli`]: command-line argument parsing
//! - [`domain`]: error types and shared record re-exports
//!
//! ## Typical Usage
//!
//! ```bash
//! # Which hooks does this build of the host provide?
//! mcstep check $O2_ROOT/lib/libBase.so $O2_ROOT/lib/libField.so
//!
//! # Record ten events
//! mcstep run --output steps.jsonl -- o2-sim -n 10
//!
//! # Look at the result
//! mcstep report steps.jsonl
//! mcstep export steps.jsonl --chrome trace.json
//! ```

pub mod analysis;
pub mod cli;
pub mod domain;
pub mod export;
pub mod inspection;
pub mod launcher;
pub mod preflight;
pub mod trace_data;
