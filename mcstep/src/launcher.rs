//! Host launching with the step logger preloaded
//!
//! Builds the environment that activates the shim ([`LaunchPlan`]) and
//! supervises the host until it exits. The host is a normal child process:
//! Ctrl-C reaches it directly through the terminal's process group, so the
//! launcher only keeps waiting for it to wind down.

use anyhow::{Context, Result};
use log::{info, warn};
use mcstep_common::{ENV_EAGER_RESOLVE, ENV_FIELD_SAMPLES, ENV_LOG, ENV_MAX_SAMPLES, ENV_OUTPUT};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use crate::cli::RunArgs;

/// Dynamic linker variable that preloads libraries on this platform
#[cfg(target_os = "macos")]
pub const PRELOAD_VAR: &str = "DYLD_INSERT_LIBRARIES";
#[cfg(not(target_os = "macos"))]
pub const PRELOAD_VAR: &str = "LD_PRELOAD";

/// Separator between entries of [`PRELOAD_VAR`]
const PRELOAD_SEPARATOR: &str = ":";

/// File name of the preload library on this platform
#[must_use]
pub fn preload_file_name() -> String {
    format!(
        "{}mcstep_intercept{}",
        std::env::consts::DLL_PREFIX,
        std::env::consts::DLL_SUFFIX
    )
}

/// Preload library installed next to the running `mcstep` binary
///
/// # Errors
/// Returns an error if the current executable path is unavailable
pub fn default_preload_path() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("Failed to locate the mcstep executable")?;
    let dir = exe.parent().context("mcstep executable has no parent directory")?;
    Ok(dir.join(preload_file_name()))
}

/// Put `library` in front of any libraries already being preloaded
#[must_use]
pub fn prepend_preload(existing: Option<&OsStr>, library: &Path) -> OsString {
    let mut value = library.as_os_str().to_os_string();
    if let Some(existing) = existing.filter(|e| !e.is_empty()) {
        value.push(PRELOAD_SEPARATOR);
        value.push(existing);
    }
    value
}

/// Program, arguments and environment for one host launch
#[derive(Debug, Clone)]
pub struct LaunchPlan {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, OsString)>,
}

impl LaunchPlan {
    /// Build the plan for `run` from its arguments
    ///
    /// `existing_preload` is the launcher's own value of [`PRELOAD_VAR`].
    ///
    /// # Errors
    /// Returns an error if no host command was given
    pub fn new(args: &RunArgs, preload: &Path, existing_preload: Option<&OsStr>) -> Result<Self> {
        let (program, rest) = args.command.split_first().context("No host command given")?;

        let mut env = vec![(PRELOAD_VAR.to_string(), prepend_preload(existing_preload, preload))];
        if let Some(output) = &args.output {
            env.push((ENV_OUTPUT.to_string(), absolute(output).into_os_string()));
        }
        if args.field_samples {
            env.push((ENV_FIELD_SAMPLES.to_string(), OsString::from("1")));
        }
        if let Some(max) = args.max_samples {
            env.push((ENV_MAX_SAMPLES.to_string(), OsString::from(max.to_string())));
        }
        if args.eager {
            env.push((ENV_EAGER_RESOLVE.to_string(), OsString::from("1")));
        }
        if let Some(filter) = &args.log {
            env.push((ENV_LOG.to_string(), OsString::from(filter)));
        }

        Ok(Self { program: program.clone(), args: rest.to_vec(), env })
    }

    /// Environment value the plan sets for `key`, if any
    #[must_use]
    pub fn env_value(&self, key: &str) -> Option<&OsStr> {
        self.env.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_os_str())
    }

    /// Spawn the host and wait for it, returning its exit code
    ///
    /// # Errors
    /// Returns an error if the host cannot be spawned or waited on
    pub async fn run(&self) -> Result<i32> {
        let mut child = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_os_str())))
            .spawn()
            .with_context(|| format!("Failed to start {}", self.program))?;

        info!("Started {} (pid {})", self.program, child.id().unwrap_or_default());

        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);
        let mut interrupted = false;

        let status = loop {
            tokio::select! {
                status = child.wait() => {
                    break status.with_context(|| format!("Failed to wait for {}", self.program))?;
                }
                _ = &mut ctrl_c, if !interrupted => {
                    interrupted = true;
                    warn!("Interrupted; waiting for {} to exit", self.program);
                }
            }
        };

        Ok(exit_code(status))
    }
}

/// Shell-style exit code: the host's own code, or 128 + signal number
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}

/// Resolve a relative path against the launcher's working directory
fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
}
