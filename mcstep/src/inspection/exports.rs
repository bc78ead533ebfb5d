//! Dynamic symbol table inspection
//!
//! The shim only works if the names in the registration table match what
//! the host build actually exports. This reads a library's dynamic symbol
//! table and reports which registered call sites it defines, for both
//! directions: a host library should define originals, the preload library
//! must define every replacement.

use mcstep_intercept::{CallSiteDescriptor, CALL_SITES};
use object::{Object, ObjectKind, ObjectSymbol};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::InspectError;

/// Registered call sites found in one library
#[derive(Debug, Clone)]
pub struct LibraryScan {
    pub path: PathBuf,
    /// Whether the file is a shared object (`ET_DYN`)
    pub is_shared: bool,
    /// Registered sites whose symbol the library defines, in table order
    pub defined: Vec<&'static CallSiteDescriptor>,
}

impl LibraryScan {
    /// Registered sites the library does not define
    pub fn missing(&self) -> impl Iterator<Item = &'static CallSiteDescriptor> + '_ {
        CALL_SITES.iter().filter(move |site| !self.defined.iter().any(|d| d.id == site.id))
    }
}

/// Read `path` and match its defined dynamic symbols against the table
///
/// # Errors
/// Returns an error if the file cannot be read or is not an object file
pub fn scan_library(path: &Path) -> Result<LibraryScan, InspectError> {
    let data = fs::read(path)
        .map_err(|source| InspectError::ReadFailed { path: path.to_path_buf(), source })?;
    let obj = object::File::parse(&*data).map_err(|e| InspectError::ParseFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let exported: HashSet<&str> = obj
        .dynamic_symbols()
        .filter(ObjectSymbol::is_definition)
        .filter_map(|symbol| symbol.name().ok())
        .collect();

    let defined = CALL_SITES.iter().filter(|site| exported.contains(site.symbol)).collect();

    Ok(LibraryScan { path: path.to_path_buf(), is_shared: obj.kind() == ObjectKind::Dynamic, defined })
}
