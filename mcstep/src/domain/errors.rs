//! Structured error types for mcstep
//!
//! Using thiserror for automatic Display implementation and error chaining.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InspectError {
    #[error("Failed to read {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path} as an object file: {reason}")]
    ParseFailed { path: PathBuf, reason: String },

    #[error("{0} is not a shared library")]
    NotSharedLibrary(PathBuf),

    #[error("Failed to read /proc/{0}/maps")]
    MemoryMapsReadFailed(i32),
}

#[derive(Error, Debug)]
pub enum TraceError {
    #[error("Failed to read trace {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Trace {0} contains no records")]
    Empty(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_shared_library_display() {
        let err = InspectError::NotSharedLibrary(PathBuf::from("/usr/bin/ls"));
        assert_eq!(err.to_string(), "/usr/bin/ls is not a shared library");
    }

    #[test]
    fn test_empty_trace_display() {
        let err = TraceError::Empty(PathBuf::from("steps.jsonl"));
        assert!(err.to_string().contains("steps.jsonl"));
    }
}
