//! Structured error types for the interception shim
//!
//! Using thiserror for automatic Display implementation and error chaining.
//! Errors are `Clone` because a failed resolution is cached in the per-site
//! slot and handed to every later caller.

use thiserror::Error;

use crate::registry::{Role, SiteId};

/// Failure to locate a host original
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Library {library} could not be opened: {reason}")]
    LibraryNotFound { library: String, reason: String },

    #[error("Symbol {symbol} not found in {library}: {reason}")]
    SymbolNotFound { library: String, symbol: String, reason: String },

    #[error("Invalid library or symbol name: {0}")]
    InvalidName(String),
}

/// Failure of a hook to forward to the host's own method
///
/// Every variant is fatal for the host: nothing was forwarded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShimError {
    #[error("Cannot resolve original {host}::{role} ({site:?}): {source}")]
    Unresolved {
        site: SiteId,
        host: &'static str,
        role: Role,
        #[source]
        source: ResolveError,
    },

    #[error("Call site {site:?} is a {actual} site, invoked as {expected}")]
    RoleMismatch { site: SiteId, expected: Role, actual: Role },
}

/// Failure inside the bundled step logger
///
/// Never crosses into host control flow; the logger reports these through
/// `log` and drops the affected record.
#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("Failed to open trace output {path}: {source}")]
    OpenFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolved_error_names_site() {
        let err = ShimError::Unresolved {
            site: SiteId::AliMcStepping,
            host: "AliMC",
            role: Role::Stepping,
            source: ResolveError::SymbolNotFound {
                library: "libSTEER.so".to_string(),
                symbol: "_ZN5AliMC8SteppingEv".to_string(),
                reason: "undefined symbol".to_string(),
            },
        };
        let msg = err.to_string();
        assert!(msg.contains("AliMC::Stepping"));
        assert!(msg.contains("_ZN5AliMC8SteppingEv"));
    }

    #[test]
    fn test_role_mismatch_display() {
        let err = ShimError::RoleMismatch {
            site: SiteId::AliMagFField,
            expected: Role::Stepping,
            actual: Role::Field,
        };
        assert_eq!(
            err.to_string(),
            "Call site AliMagFField is a Field site, invoked as Stepping"
        );
    }
}
