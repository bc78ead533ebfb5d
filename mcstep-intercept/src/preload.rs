//! Process-global shim used by the exported entry points
//!
//! The shim is built on the first intercepted call. Building it reads
//! [`Config`] from the environment and initializes logging with its filter;
//! neither can fail in a way that stops the host.
//!
//! Any [`ShimError`] reaching this layer means the host call could not be
//! forwarded. There is no correct way to continue the host without its
//! own method, so [`fatal`] aborts the process.

#![allow(unsafe_code)] // forwards raw host pointers
#![cfg_attr(any(test, not(feature = "preload")), allow(dead_code))]

use log::{debug, error, info, warn};
use std::ffi::c_void;
use std::sync::LazyLock;

use crate::config::Config;
use crate::errors::ShimError;
use crate::recorder::StepLogger;
use crate::registry::{descriptor, SiteId};
use crate::resolver::DlResolver;
use crate::shim::Shim;

/// The shim type the preloaded library runs with
pub type PreloadShim = Shim<DlResolver, StepLogger>;

static SHIM: LazyLock<PreloadShim> = LazyLock::new(build);

/// The process-global shim, built on first use
pub fn shim() -> &'static PreloadShim {
    &SHIM
}

fn build() -> PreloadShim {
    let config = Config::from_env();
    init_logging(&config.log_filter);
    for warning in &config.warnings {
        warn!("{warning}");
    }
    debug!("{config:?}");
    info!("{}", startup_line());

    let shim = Shim::new(DlResolver::new(), StepLogger::new(config.logger));

    if config.eager_resolve {
        // Variants the host does not contain are expected to be missing here.
        for failure in shim.resolve_all() {
            warn!("Eager resolution: {failure}");
        }
    }
    shim
}

// The pid is reported once, by the step logger when it initializes
fn startup_line() -> String {
    format!("mcstep-intercept {} active", env!("CARGO_PKG_VERSION"))
}

fn init_logging(filter: &str) {
    // An embedding host may already own the global logger
    let _ = env_logger::Builder::new().parse_filters(filter).try_init();
}

/// Report an unrecoverable forwarding failure and abort the host
pub fn fatal(err: &ShimError) -> ! {
    error!("{err}");
    eprintln!("[mcstep] fatal: {err}; aborting because the host call cannot be forwarded");
    std::process::abort();
}

/// Continue only if the hook forwarded; abort otherwise
pub fn or_abort(result: Result<(), ShimError>) {
    if let Err(err) = result {
        fatal(&err);
    }
}

pub(crate) unsafe fn stepping(site: SiteId, this: *mut c_void) {
    or_abort(shim().stepping(site, this));
}

pub(crate) unsafe fn finish_event(site: SiteId, this: *mut c_void) {
    or_abort(shim().finish_event(site, this));
}

pub(crate) unsafe fn construct_geometry(site: SiteId, this: *mut c_void) {
    info!("Geometry construction via {}", descriptor(site).host);
    or_abort(shim().construct_geometry(site, this));
}

pub(crate) unsafe fn field(site: SiteId, this: *mut c_void, point: *const f64, b_field: *mut f64) {
    or_abort(shim().field(site, this, point, b_field));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startup_line_leaves_pid_to_step_logger() {
        let line = startup_line();
        assert_eq!(line, format!("mcstep-intercept {} active", env!("CARGO_PKG_VERSION")));
        assert!(!line.contains("pid"));
    }
}
