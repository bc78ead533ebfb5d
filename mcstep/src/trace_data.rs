//! Trace data loaded back from a step logger file
//!
//! A trace is written line by line from inside a host that may crash at any
//! point, so a torn last line is normal. Malformed lines are skipped and
//! counted rather than failing the whole load.

use log::{debug, warn};
use mcstep_common::{parse_trace_line, EventSummary, SessionInfo, TraceRecord};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::domain::TraceError;

/// Immutable contents of one trace file
#[derive(Debug, Default)]
pub struct TraceData {
    /// Session header, if the file has one
    pub session: Option<SessionInfo>,
    /// Event records in file order
    pub events: Vec<EventSummary>,
    /// Lines that were not valid records (blank lines excluded)
    pub malformed: usize,
}

impl TraceData {
    /// Load a JSON-lines trace file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or holds no valid record
    pub fn load(path: &Path) -> Result<Self, TraceError> {
        let file = File::open(path)
            .map_err(|source| TraceError::ReadFailed { path: path.to_path_buf(), source })?;
        let data = Self::from_reader(BufReader::new(file))?;

        if data.session.is_none() && data.events.is_empty() {
            return Err(TraceError::Empty(path.to_path_buf()));
        }
        if data.malformed > 0 {
            warn!("{}: skipped {} malformed line(s)", path.display(), data.malformed);
        }
        Ok(data)
    }

    /// Parse records from any buffered reader
    ///
    /// # Errors
    /// Returns an error only on I/O failure
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, TraceError> {
        let mut data = Self::default();

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match parse_trace_line(&line) {
                Ok(TraceRecord::Session(info)) => {
                    if data.session.is_some() {
                        warn!("line {}: additional session header ignored", index + 1);
                    } else {
                        data.session = Some(info);
                    }
                }
                Ok(TraceRecord::Event(event)) => data.events.push(event),
                Err(e) => {
                    debug!("line {}: {e}", index + 1);
                    data.malformed += 1;
                }
            }
        }

        Ok(data)
    }

    /// Wall clock span covered by the events, in microseconds
    #[must_use]
    pub fn duration_us(&self) -> u64 {
        self.events.iter().map(|e| e.elapsed_us).max().unwrap_or(0)
    }
}
