//! # mcstep - Main Entry Point
//!
//! Dispatches the subcommands defined in [`mcstep::cli::Command`]. `run`
//! exits with the host's own exit code; everything else uses the codes
//! below.

#![allow(clippy::cast_precision_loss)]

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use mcstep::analysis::summarize;
use mcstep::cli::{Args, Command, RunArgs};
use mcstep::export::ChromeTraceExporter;
use mcstep::inspection::{find_mapping, scan_library};
use mcstep::launcher::{default_preload_path, preload_file_name, LaunchPlan, PRELOAD_VAR};
use mcstep::preflight::run_preflight_checks;
use mcstep::trace_data::TraceData;
use mcstep_intercept::{HostKind, CALL_SITES};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;

fn main() {
    env_logger::init();
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            std::process::exit(if e.use_stderr() { EXIT_USAGE } else { EXIT_SUCCESS });
        }
    };

    std::process::exit(match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            EXIT_ERROR
        }
    });
}

#[tokio::main]
async fn run(args: Args) -> Result<i32> {
    match args.command {
        Command::Run(run_args) => run_host(&run_args).await,
        Command::Check { libraries } => check(&libraries),
        Command::Sites => {
            print_sites();
            Ok(EXIT_SUCCESS)
        }
        Command::Attached { pid } => attached(pid),
        Command::Report { trace } => report(&trace),
        Command::Export { trace, chrome } => export(&trace, &chrome),
    }
}

async fn run_host(args: &RunArgs) -> Result<i32> {
    let preload = match &args.preload {
        Some(path) => path.clone(),
        None => default_preload_path()?,
    };
    let preload = std::fs::canonicalize(&preload).unwrap_or(preload);
    run_preflight_checks(&preload)?;

    let existing = std::env::var_os(PRELOAD_VAR);
    let plan = LaunchPlan::new(args, &preload, existing.as_deref())?;

    if !args.quiet {
        eprintln!("mcstep: preloading {}", preload.display());
        if let Some(output) = &args.output {
            eprintln!("mcstep: trace -> {}", output.display());
        }
    }

    let code = plan.run().await?;
    info!("{} exited with code {code}", plan.program);
    Ok(code)
}

fn check(libraries: &[PathBuf]) -> Result<i32> {
    let mut any_defined = false;

    for library in libraries {
        let scan = scan_library(library)?;
        println!("{}", library.display());
        if !scan.is_shared {
            println!("  (not a shared library)");
        }
        if scan.defined.is_empty() {
            println!("  no registered call sites");
        }
        for site in &scan.defined {
            println!("  {:<32} {:<18} {}", site.host, site.role.to_string(), site.symbol);
        }
        any_defined |= !scan.defined.is_empty();
    }

    Ok(if any_defined { EXIT_SUCCESS } else { EXIT_ERROR })
}

fn print_sites() {
    println!("{:<28} {:<28} {:<18} {:<14} SYMBOL", "SITE", "HOST", "ROLE", "LIBRARY");
    for site in CALL_SITES {
        let kind = match site.kind {
            HostKind::Application => "",
            HostKind::MultiApplication => " (multi)",
            HostKind::MagneticField => " (field)",
        };
        println!(
            "{:<28} {:<28} {:<18} {:<14} {}",
            format!("{:?}", site.id),
            format!("{}{kind}", site.host),
            site.role.to_string(),
            site.library,
            site.symbol
        );
    }
}

fn attached(pid: i32) -> Result<i32> {
    let needle = preload_file_name();
    match find_mapping(pid, &needle)? {
        Some(range) => {
            println!(
                "{} is loaded in process {pid} at 0x{:x}-0x{:x}",
                range.path.display(),
                range.start,
                range.end
            );
            Ok(EXIT_SUCCESS)
        }
        None => {
            println!("{needle} is not loaded in process {pid}");
            Ok(EXIT_ERROR)
        }
    }
}

fn report(trace: &Path) -> Result<i32> {
    let data = TraceData::load(trace)?;
    let summary = summarize(&data);

    println!("Trace: {}", trace.display());
    if let Some(session) = &data.session {
        println!(
            "  Host pid {} (logger {}), field samples {}",
            session.pid,
            session.version,
            if session.field_samples { "on" } else { "off" }
        );
    } else {
        println!("  No session header (logger never initialized)");
    }
    println!("  Events:        {}", summary.events);
    println!("  Steps:         {} (mean {:.1} per event)", summary.total_steps, summary.mean_steps);
    if let Some((event, steps)) = summary.busiest_event {
        println!("  Busiest event: {event} with {steps} steps");
    }
    println!("  Field calls:   {}", summary.total_field_calls);
    if let Some(max) = summary.max_field_magnitude {
        println!("  Largest |B|:   {max:.6}");
    }
    println!("  Duration:      {:.3}s", summary.duration_us as f64 / 1_000_000.0);
    if summary.malformed_lines > 0 {
        println!("  Skipped {} malformed line(s)", summary.malformed_lines);
    }

    Ok(EXIT_SUCCESS)
}

fn export(trace: &Path, chrome: &Path) -> Result<i32> {
    let data = TraceData::load(trace)?;
    let exporter = ChromeTraceExporter::from_trace(&data);

    let file = File::create(chrome)
        .with_context(|| format!("Failed to create {}", chrome.display()))?;
    let mut writer = BufWriter::new(file);
    exporter.export(&mut writer)?;
    writer.flush().with_context(|| format!("Failed to write {}", chrome.display()))?;

    eprintln!("Wrote {} trace events to {}", exporter.event_count(), chrome.display());
    Ok(EXIT_SUCCESS)
}
