// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::Overrides;

/// Command-line arguments for `fimwatch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "fimwatch",
    version,
    about = "Detect created, modified and deleted files against a recorded baseline.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `fimwatch.toml` in the current working directory, if present.
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `FIMWATCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Scan the target and write a new baseline.
    Init(CommonArgs),
    /// Compare the target with the baseline and report changes.
    Check(CommonArgs),
    /// Report changes, then replace the baseline with the current state.
    Update(UpdateArgs),
    /// Monitor the target continuously.
    Watch(WatchArgs),
}

/// Options shared by every subcommand.
#[derive(Debug, Clone, Default, Args)]
pub struct CommonArgs {
    /// Directory to monitor.
    #[arg(value_name = "TARGET")]
    pub target: Option<PathBuf>,

    /// Baseline file.
    #[arg(long, value_name = "PATH")]
    pub baseline: Option<PathBuf>,

    /// Change log file (JSON Lines).
    #[arg(long, value_name = "PATH")]
    pub log: Option<PathBuf>,

    /// Exclusion pattern; repeatable, `!pattern` re-includes.
    #[arg(long = "exclude", value_name = "GLOB")]
    pub exclude: Vec<String>,

    /// Hash algorithm for new baselines (sha256, blake3).
    #[arg(long, value_name = "NAME")]
    pub algorithm: Option<String>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct UpdateArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Replace the baseline without asking.
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(Debug, Clone, Default, Args)]
pub struct WatchArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Poll the tree instead of using native notifications.
    #[arg(long)]
    pub polling: bool,

    /// Quiet period per path before it is evaluated.
    #[arg(long, value_name = "MS")]
    pub debounce_ms: Option<u64>,

    /// Delay before re-reading an unreadable file.
    #[arg(long, value_name = "MS")]
    pub retry_ms: Option<u64>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl CliArgs {
    pub fn config_path(&self) -> Option<&Path> {
        self.config.as_deref()
    }

    /// Command-line values to layer over the config file.
    pub fn overrides(&self) -> Overrides {
        let (common, watch) = match &self.command {
            Command::Init(c) | Command::Check(c) => (c, None),
            Command::Update(u) => (&u.common, None),
            Command::Watch(w) => (&w.common, Some(w)),
        };

        Overrides {
            target: common.target.clone(),
            baseline: common.baseline.clone(),
            log: common.log.clone(),
            exclude: common.exclude.clone(),
            hash_algorithm: common.algorithm.clone(),
            debounce_ms: watch.and_then(|w| w.debounce_ms),
            retry_ms: watch.and_then(|w| w.retry_ms),
            force_polling: watch.is_some_and(|w| w.polling),
        }
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_repeated_excludes_in_order() {
        let args = CliArgs::try_parse_from([
            "fimwatch", "check", "/srv", "--exclude", "*.log", "--exclude", "!keep.log",
        ])
        .unwrap();
        let o = args.overrides();
        assert_eq!(o.target, Some(PathBuf::from("/srv")));
        assert_eq!(o.exclude, vec!["*.log".to_string(), "!keep.log".to_string()]);
        assert!(!o.force_polling);
    }

    #[test]
    fn watch_flags_become_overrides() {
        let args = CliArgs::try_parse_from([
            "fimwatch", "--log-level", "debug", "watch", "--polling", "--debounce-ms", "50",
        ])
        .unwrap();
        let o = args.overrides();
        assert!(o.force_polling);
        assert_eq!(o.debounce_ms, Some(50));
        assert_eq!(o.retry_ms, None);
    }

    #[test]
    fn global_config_flag_after_subcommand() {
        let args =
            CliArgs::try_parse_from(["fimwatch", "update", "--yes", "--config", "x.toml"]).unwrap();
        assert_eq!(args.config_path(), Some(Path::new("x.toml")));
        assert!(matches!(args.command, Command::Update(UpdateArgs { yes: true, .. })));
    }
}
