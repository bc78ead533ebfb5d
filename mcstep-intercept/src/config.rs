//! Configuration for the preloaded library
//!
//! A preloaded library has no command line, so everything comes from the
//! host's environment (usually set by `mcstep run`). Invalid values are
//! replaced by their default and recorded in [`Config::warnings`];
//! configuration never prevents the host from running.
//!
//! The logging filter is itself configuration, so nothing here logs: the
//! caller initializes logging from [`Config::log_filter`] and then reports
//! the warnings.

use mcstep_common::{
    parse_flag, DEFAULT_MAX_SAMPLES, ENV_EAGER_RESOLVE, ENV_FIELD_SAMPLES, ENV_LOG,
    ENV_MAX_SAMPLES, ENV_OUTPUT,
};
use std::path::PathBuf;

/// Default `env_logger` filter inside the host
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Step logger settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepLoggerConfig {
    /// Trace file; `None` keeps summaries in the log only
    pub output: Option<PathBuf>,
    /// Retain individual field samples per event
    pub field_samples: bool,
    /// Cap on retained samples per event
    pub max_samples: usize,
}

impl Default for StepLoggerConfig {
    fn default() -> Self {
        Self { output: None, field_samples: false, max_samples: DEFAULT_MAX_SAMPLES }
    }
}

/// Everything the preloaded library reads at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub logger: StepLoggerConfig,
    /// Resolve all registered originals on first hook invocation
    pub eager_resolve: bool,
    /// `env_logger` filter string
    pub log_filter: String,
    /// Ignored values, one message each
    pub warnings: Vec<String>,
}

impl Config {
    /// Read configuration from the process environment
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut warnings = Vec::new();
        let output = lookup(ENV_OUTPUT).filter(|v| !v.trim().is_empty()).map(PathBuf::from);

        let field_samples = flag(&lookup, ENV_FIELD_SAMPLES, false, &mut warnings);
        let eager_resolve = flag(&lookup, ENV_EAGER_RESOLVE, false, &mut warnings);

        let max_samples = match lookup(ENV_MAX_SAMPLES) {
            None => DEFAULT_MAX_SAMPLES,
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                warnings.push(format!(
                    "Ignoring {ENV_MAX_SAMPLES}={raw:?}: not a count, using {DEFAULT_MAX_SAMPLES}"
                ));
                DEFAULT_MAX_SAMPLES
            }),
        };

        let log_filter = lookup(ENV_LOG)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        Self {
            logger: StepLoggerConfig { output, field_samples, max_samples },
            eager_resolve,
            log_filter,
            warnings,
        }
    }
}

fn flag<F>(lookup: &F, name: &str, default: bool, warnings: &mut Vec<String>) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => default,
        Some(raw) => parse_flag(&raw).unwrap_or_else(|| {
            warnings.push(format!("Ignoring {name}={raw:?}: expected a boolean, using {default}"));
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.logger, StepLoggerConfig::default());
        assert!(!config.eager_resolve);
        assert_eq!(config.log_filter, "info");
        assert!(config.warnings.is_empty());
    }

    #[test]
    fn test_all_variables() {
        let config = config_from(&[
            ("MCSTEP_OUTPUT", "/tmp/steps.jsonl"),
            ("MCSTEP_FIELD_SAMPLES", "yes"),
            ("MCSTEP_MAX_SAMPLES", "25"),
            ("MCSTEP_LOG", "debug"),
            ("MCSTEP_EAGER_RESOLVE", "1"),
        ]);
        assert_eq!(config.logger.output, Some(PathBuf::from("/tmp/steps.jsonl")));
        assert!(config.logger.field_samples);
        assert_eq!(config.logger.max_samples, 25);
        assert_eq!(config.log_filter, "debug");
        assert!(config.eager_resolve);
        assert!(config.warnings.is_empty());
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = config_from(&[
            ("MCSTEP_OUTPUT", "  "),
            ("MCSTEP_FIELD_SAMPLES", "sometimes"),
            ("MCSTEP_MAX_SAMPLES", "-4"),
            ("MCSTEP_LOG", " "),
        ]);
        assert_eq!(config.logger, StepLoggerConfig::default());
        assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);
        assert_eq!(config.warnings.len(), 2);
        assert!(config.warnings[0].contains("MCSTEP_FIELD_SAMPLES=\"sometimes\""));
        assert!(config.warnings[1].contains("MCSTEP_MAX_SAMPLES=\"-4\""));
    }
}
