//! CLI argument definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "mcstep",
    version,
    about = "Record step and field traces of virtual Monte Carlo simulations",
    after_help = "\
EXAMPLES:
    mcstep run --output steps.jsonl -- o2-sim -n 10     Trace a simulation
    mcstep check $O2_ROOT/lib/libField.so               Which hooks a library provides
    mcstep report steps.jsonl                           Summarize a trace
    mcstep export steps.jsonl --chrome trace.json       Convert for chrome://tracing"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a host command with the step logger preloaded
    Run(RunArgs),

    /// List which registered call sites the given libraries define
    Check {
        /// Host shared libraries to inspect
        #[arg(required = true, value_name = "LIBRARY")]
        libraries: Vec<PathBuf>,
    },

    /// Print the call-site registration table
    Sites,

    /// Check whether the step logger is loaded into a running process
    Attached {
        /// Process ID to inspect
        #[arg(short, long)]
        pid: i32,
    },

    /// Summarize a recorded trace
    Report {
        /// Trace file written by the step logger
        trace: PathBuf,
    },

    /// Convert a recorded trace to another format
    Export {
        /// Trace file written by the step logger
        trace: PathBuf,

        /// Write Chrome Trace Event Format JSON to FILE
        #[arg(long, value_name = "FILE")]
        chrome: PathBuf,
    },
}

#[derive(clap::Args)]
pub struct RunArgs {
    /// Preload library (defaults to the one installed next to this binary)
    #[arg(long, value_name = "PATH")]
    pub preload: Option<PathBuf>,

    /// Write the trace to FILE (JSON lines)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Keep individual field samples in each event record
    #[arg(long)]
    pub field_samples: bool,

    /// Per-event cap on kept field samples
    #[arg(long, value_name = "N", requires = "field_samples")]
    pub max_samples: Option<usize>,

    /// Resolve every registered original at the first hook call
    #[arg(long)]
    pub eager: bool,

    /// Log filter inside the host (e.g. "debug", "warn")
    #[arg(long, value_name = "FILTER")]
    pub log: Option<String>,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,

    /// Host command and its arguments
    #[arg(last = true, required = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}
