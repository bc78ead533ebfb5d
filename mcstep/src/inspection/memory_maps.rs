//! Memory mapping utilities for process address space analysis
//!
//! Parses /proc/pid/maps to tell whether a given shared library is mapped
//! into a running process, which is how `mcstep attached` confirms that the
//! step logger actually made it into a simulation.

use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::InspectError;

/// Memory range of a loaded library in a process's address space
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryRange {
    pub start: u64,
    pub end: u64,
    /// Full path of the mapped file as the kernel reports it
    pub path: PathBuf,
}

impl MemoryRange {
    #[must_use]
    pub fn size(&self) -> u64 {
        self.end - self.start
    }
}

/// Find the mapping of the first library whose file name contains `needle`
///
/// All segments of that file are merged into one range from the minimum
/// start to the maximum end address.
///
/// # Errors
/// Returns an error if /proc/pid/maps cannot be read
pub fn find_mapping(pid: i32, needle: &str) -> Result<Option<MemoryRange>, InspectError> {
    let maps_path = format!("/proc/{pid}/maps");
    let maps =
        fs::read_to_string(&maps_path).map_err(|_| InspectError::MemoryMapsReadFailed(pid))?;
    let range = parse_maps(&maps, needle);
    if let Some(range) = &range {
        debug!(
            "{} mapped at 0x{:x} - 0x{:x} (size: {} KB)",
            range.path.display(),
            range.start,
            range.end,
            range.size() / 1024
        );
    }
    Ok(range)
}

/// Parse the text of a maps file; see [`find_mapping`]
#[must_use]
pub fn parse_maps(maps: &str, needle: &str) -> Option<MemoryRange> {
    let mut found: Option<MemoryRange> = None;

    for line in maps.lines() {
        // "start-end perms offset dev inode pathname"
        let mut parts = line.split_whitespace();
        let (Some(range), Some(path)) = (parts.next(), parts.nth(4)) else {
            continue;
        };
        let matches = Path::new(path)
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.contains(needle));
        if !matches {
            continue;
        }
        if found.as_ref().is_some_and(|f| f.path != Path::new(path)) {
            continue;
        }
        let Some((start, end)) = range.split_once('-') else {
            continue;
        };
        let (Ok(start), Ok(end)) = (u64::from_str_radix(start, 16), u64::from_str_radix(end, 16))
        else {
            continue;
        };

        found = Some(match found {
            Some(prev) => MemoryRange { start: prev.start.min(start), end: prev.end.max(end), ..prev },
            None => MemoryRange { start, end, path: PathBuf::from(path) },
        });
    }

    found
}
