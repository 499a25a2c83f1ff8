// SPDX-License-Identifier: Apache-2.0

use clap::{ArgAction, Args};
use std::path::PathBuf;

use crate::config::{Config, default_checkpoint_dir};

#[derive(Debug, Args, Clone)]
pub struct TailArgs {
    /// Glob matching the log file and its rotated siblings (e.g. "/var/log/app.log*")
    #[arg(env = "TAILCHASE_SOURCE_PATTERN")]
    pub source_pattern: String,

    /// Prefix every record with its source file and checkpoint
    #[arg(short, long, env = "TAILCHASE_VERBOSE", default_value = "false")]
    pub verbose: bool,

    /// Read records without emitting them or saving the checkpoint
    #[arg(long, env = "TAILCHASE_DRYRUN", default_value = "false")]
    pub dryrun: bool,

    /// Drain older rotated files before the most recent one
    #[arg(long, env = "TAILCHASE_BACKFILL", default_value = "true", action = ArgAction::Set)]
    pub backfill: bool,

    /// Keep following the files once caught up; exit when false
    #[arg(long, env = "TAILCHASE_FOLLOW", default_value = "true", action = ArgAction::Set)]
    pub follow: bool,

    /// Directory for checkpoint records, defaults to $HOME/.tailchase
    #[arg(long, env = "TAILCHASE_CHECKPOINT_DIR")]
    pub checkpoint_dir: Option<PathBuf>,

    /// Wait between polls when there is nothing new
    #[arg(
        long,
        env = "TAILCHASE_IDLE_INTERVAL",
        default_value = "10s",
        value_parser = humantime::parse_duration
    )]
    pub idle_interval: std::time::Duration,

    /// Wait before retrying after an error
    #[arg(
        long,
        env = "TAILCHASE_BACKOFF_INTERVAL",
        default_value = "5s",
        value_parser = humantime::parse_duration
    )]
    pub backoff_interval: std::time::Duration,
}

impl From<TailArgs> for Config {
    fn from(args: TailArgs) -> Self {
        Config {
            source_pattern: args.source_pattern,
            verbose: args.verbose,
            dryrun: args.dryrun,
            backfill: args.backfill,
            follow: args.follow,
            checkpoint_dir: args.checkpoint_dir.unwrap_or_else(default_checkpoint_dir),
            idle_interval: args.idle_interval,
            backoff_interval: args.backoff_interval,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::time::Duration;

    #[derive(Debug, Parser)]
    struct Cli {
        #[command(flatten)]
        tail: TailArgs,
    }

    fn parse(args: &[&str]) -> Config {
        let cli = Cli::try_parse_from(std::iter::once("tailchase").chain(args.iter().copied()))
            .unwrap();
        cli.tail.into()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&["/var/log/app.log*"]);

        assert_eq!(config.source_pattern, "/var/log/app.log*");
        assert!(!config.verbose);
        assert!(!config.dryrun);
        assert!(config.backfill);
        assert!(config.follow);
        assert_eq!(config.idle_interval, Duration::from_secs(10));
        assert_eq!(config.backoff_interval, Duration::from_secs(5));
        assert_eq!(config.checkpoint_dir, default_checkpoint_dir());
    }

    #[test]
    fn test_overrides() {
        let config = parse(&[
            "--verbose",
            "--dryrun",
            "--backfill",
            "false",
            "--follow",
            "false",
            "--checkpoint-dir",
            "/tmp/cp",
            "--idle-interval",
            "250ms",
            "--backoff-interval",
            "1m",
            "/var/log/app.log*",
        ]);

        assert!(config.verbose);
        assert!(config.dryrun);
        assert!(!config.backfill);
        assert!(!config.follow);
        assert_eq!(config.checkpoint_dir, PathBuf::from("/tmp/cp"));
        assert_eq!(config.idle_interval, Duration::from_millis(250));
        assert_eq!(config.backoff_interval, Duration::from_secs(60));
    }

    #[test]
    fn test_pattern_required() {
        assert!(Cli::try_parse_from(["tailchase"]).is_err());
    }
}
