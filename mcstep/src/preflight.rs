//! Pre-flight checks for `mcstep run`
//!
//! Validates the preload library before a host is launched with it. A
//! library that is missing a hook would not fail at startup: the host would
//! silently call its own method and the trace would come out empty.

use anyhow::{bail, Context, Result};
use std::path::Path;

use crate::domain::InspectError;
use crate::inspection::scan_library;

/// Run all pre-flight checks on the preload library
pub fn run_preflight_checks(preload: &Path) -> Result<()> {
    check_library_exists(preload)?;
    check_exports(preload)?;
    Ok(())
}

/// Check that the preload library exists and is a file
fn check_library_exists(preload: &Path) -> Result<()> {
    if !preload.exists() {
        bail!(
            "Preload library not found: {}\n\n\
             Build it with: cargo xtask build-preload\n\
             or pass its location with --preload PATH",
            preload.display()
        );
    }
    if !preload.is_file() {
        bail!(
            "Not a file: {}\n\n\
             --preload must point to the shared library, not a directory.",
            preload.display()
        );
    }
    Ok(())
}

/// Check that the library is a shared object defining every registered hook
fn check_exports(preload: &Path) -> Result<()> {
    let scan = scan_library(preload)?;

    if !scan.is_shared {
        return Err(InspectError::NotSharedLibrary(preload.to_path_buf()))
            .context("The dynamic linker can only preload shared objects");
    }

    let missing: Vec<String> =
        scan.missing().map(|site| format!("  {}::{} ({})", site.host, site.role, site.symbol)).collect();
    if !missing.is_empty() {
        bail!(
            "{} does not export {} registered hook(s):\n{}\n\n\
             Was it built without the `preload` feature?",
            preload.display(),
            missing.len(),
            missing.join("\n")
        );
    }

    Ok(())
}
