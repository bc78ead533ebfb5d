//! JSON-lines trace output

use mcstep_common::TraceRecord;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::errors::RecorderError;

/// Append-only writer of [`TraceRecord`] lines
///
/// Each record is flushed as soon as it is written: a host that crashes or
/// calls `exit()` mid-run still leaves every completed event on disk.
pub struct TraceSink {
    path: PathBuf,
    writer: BufWriter<File>,
    records: u64,
}

impl TraceSink {
    /// Create (or truncate) the trace file
    ///
    /// # Errors
    /// Returns an error if the file cannot be created
    pub fn create(path: impl AsRef<Path>) -> Result<Self, RecorderError> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|source| RecorderError::OpenFailed {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self { path, writer: BufWriter::new(file), records: 0 })
    }

    /// Write one record as a line
    ///
    /// # Errors
    /// Returns an error if serialization or the write fails
    pub fn write(&mut self, record: &TraceRecord) -> Result<(), RecorderError> {
        let line = record.to_line()?;
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.records += 1;
        Ok(())
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records written so far
    #[must_use]
    pub fn records(&self) -> u64 {
        self.records
    }
}
