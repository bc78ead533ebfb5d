//! Inspection of host libraries and running processes

pub mod exports;
pub mod memory_maps;

pub use exports::{scan_library, LibraryScan};
pub use memory_maps::{find_mapping, parse_maps, MemoryRange};
