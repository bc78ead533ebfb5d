//! # mcstep-intercept - Preloadable Step and Field Logger
//!
//! A shared library that, when preloaded into a virtual Monte Carlo host
//! application, replaces a fixed set of the host's lifecycle methods with
//! hooks that record what happened and then forward to the host's own
//! implementation. The host is neither modified nor recompiled.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Host Application                           │
//! │   App::Stepping()  App::FinishEvent()  App::ConstructGeometry() │
//! │   Field::Field(x, B)                                            │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ dynamic linker binds to preloaded symbols
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  mcstep-intercept (This Crate)                  │
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐        │
//! │  │  Registry    │──▶│    Shim      │──▶│  Recorder    │        │
//! │  │ (entry pts)  │   │ (forwarding) │   │ (StepLogger) │        │
//! │  └──────────────┘   └──────┬───────┘   └──────┬───────┘        │
//! │                            │                  │                 │
//! │                            ▼                  ▼                 │
//! │                     ┌──────────────┐   ┌──────────────┐        │
//! │                     │  Resolver    │   │  TraceSink   │        │
//! │                     │ (dlopen/sym) │   │ (JSON lines) │        │
//! │                     └──────┬───────┘   └──────────────┘        │
//! └────────────────────────────┼────────────────────────────────────┘
//!                              │ host's own method
//!                              ▼
//!                     host library (libBase, libSTEER, ...)
//! ```
//!
//! ## Module Structure
//!
//! - [`registry`]: the declarative call-site table and exported entry points
//! - [`shim`]: hook contracts, per-site resolution cache, recorder isolation
//! - [`resolver`]: original-implementation lookup ([`resolver::DlResolver`])
//! - [`recorder`]: the [`recorder::Recorder`] interface and the bundled step logger
//! - [`config`]: environment configuration
//! - [`preload`]: the process-global shim and fatal error handling
//!
//! ## Typical Usage
//!
//! ```bash
//! # Through the launcher
//! mcstep run --output steps.jsonl -- o2-sim -n 10
//!
//! # Or by hand
//! MCSTEP_OUTPUT=steps.jsonl LD_PRELOAD=libmcstep_intercept.so o2-sim -n 10
//! ```
//!
//! ## Ordering Dependency
//!
//! The logger initializes in the geometry hook. Steps and field calls that
//! arrive earlier are counted but cannot reach the trace file until then;
//! see [`recorder::StepLogger`].

pub mod config;
pub mod errors;
pub mod preload;
pub mod recorder;
pub mod registry;
pub mod resolver;
pub mod shim;

pub use errors::{RecorderError, ResolveError, ShimError};
pub use recorder::{Recorder, StepLogger};
pub use registry::{CallSiteDescriptor, HostKind, Role, SiteId, CALL_SITES};
pub use resolver::{DlResolver, OriginalAddr, SymbolResolver};
pub use shim::{FieldFn, MethodFn, ResolvedOriginal, Shim};
