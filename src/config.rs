// SPDX-License-Identifier: Apache-2.0

//! Configuration for a tail loop.

use std::path::PathBuf;
use std::time::Duration;

/// Directory name for checkpoints under the home directory
const CHECKPOINT_DIR_NAME: &str = ".tailchase";

/// Configuration for following one source pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Glob matching the live log file and its rotated siblings
    pub source_pattern: String,
    /// Include the source path and checkpoint with every emitted record
    pub verbose: bool,
    /// Read and report records without handing them off or saving progress
    pub dryrun: bool,
    /// Drain older rotated files before following the live one
    pub backfill: bool,
    /// Keep polling for new records once caught up; otherwise stop
    pub follow: bool,
    /// Directory holding checkpoint records
    pub checkpoint_dir: PathBuf,
    /// Wait between polls when there is nothing to read
    pub idle_interval: Duration,
    /// Wait before retrying after a failed cycle
    pub backoff_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_pattern: String::new(),
            verbose: false,
            dryrun: false,
            backfill: true,
            follow: true,
            checkpoint_dir: default_checkpoint_dir(),
            idle_interval: Duration::from_secs(10),
            backoff_interval: Duration::from_secs(5),
        }
    }
}

impl Config {
    pub fn new(source_pattern: impl Into<String>) -> Self {
        Self {
            source_pattern: source_pattern.into(),
            ..Default::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.source_pattern.trim().is_empty() {
            return Err("source pattern must be specified".to_string());
        }

        if let Err(e) = glob::Pattern::new(&self.source_pattern) {
            return Err(format!(
                "invalid source pattern {:?}: {}",
                self.source_pattern, e
            ));
        }

        if self.idle_interval.is_zero() {
            return Err("idle interval must be positive".to_string());
        }

        if self.backoff_interval.is_zero() {
            return Err("backoff interval must be positive".to_string());
        }

        Ok(())
    }
}

/// `$HOME/.tailchase`, or `./.tailchase` when there is no home directory
pub fn default_checkpoint_dir() -> PathBuf {
    std::env::var_os("HOME")
        .filter(|home| !home.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CHECKPOINT_DIR_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert!(!config.verbose);
        assert!(!config.dryrun);
        assert!(config.backfill);
        assert!(config.follow);
        assert_eq!(config.idle_interval, Duration::from_secs(10));
        assert_eq!(config.backoff_interval, Duration::from_secs(5));
        assert!(config.checkpoint_dir.ends_with(CHECKPOINT_DIR_NAME));
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::new("/var/log/app.log*");
        assert!(config.validate().is_ok());

        config.source_pattern = "  ".to_string();
        assert!(config.validate().is_err());

        config.source_pattern = "/var/log/[app.log".to_string();
        assert!(config.validate().is_err());

        config.source_pattern = "/var/log/app.log*".to_string();
        config.idle_interval = Duration::ZERO;
        assert!(config.validate().is_err());
    }
}
