use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Parser)]
struct Args {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Parser)]
enum Cmd {
    /// Build the preloadable step logger and install it next to `mcstep`
    BuildPreload {
        /// Build with the dev profile instead of release
        #[arg(long)]
        debug: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Cmd::BuildPreload { debug } => build_preload(debug)?,
    }

    Ok(())
}

fn build_preload(debug: bool) -> Result<()> {
    let profile = if debug { "debug" } else { "release" };

    // Both packages in one invocation so the launcher and the library it
    // looks for end up in the same target directory.
    let mut cmd = Command::new(std::env::var("CARGO").unwrap_or_else(|_| "cargo".to_string()));
    cmd.arg("build").arg("--package").arg("mcstep-intercept").arg("--package").arg("mcstep");
    if !debug {
        cmd.arg("--release");
    }

    let status = cmd.status().context("Failed to run cargo build")?;
    if !status.success() {
        anyhow::bail!("Failed to build the preload library");
    }

    let library = target_dir()?.join(profile).join(format!(
        "{}mcstep_intercept{}",
        std::env::consts::DLL_PREFIX,
        std::env::consts::DLL_SUFFIX
    ));
    if !library.is_file() {
        anyhow::bail!("Build succeeded but {} is missing", library.display());
    }

    println!("✓ Preload library built successfully");
    println!("  Library: {}", library.display());
    println!("  Profile: {profile}");
    println!("  Usage:   mcstep run --output steps.jsonl -- <host command>");

    Ok(())
}

fn target_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os("CARGO_TARGET_DIR") {
        return Ok(PathBuf::from(dir));
    }
    let xtask_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let root = xtask_dir.parent().context("xtask has no workspace root")?;
    Ok(root.join("target"))
}
