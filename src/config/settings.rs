// src/config/settings.rs

//! Resolved settings: defaults, then the config file, then the command line.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::baseline::ScanOptions;
use crate::config::model::RawConfigFile;
use crate::errors::Result;
use crate::exclude::ExclusionMatcher;
use crate::paths::normalize_key;
use crate::types::{HashAlgorithm, WatchMode};
use crate::watch::WatchOptions;

pub const DEFAULT_TARGET: &str = ".";
pub const DEFAULT_BASELINE: &str = "baseline.json";
pub const DEFAULT_LOG: &str = "changes_log.jsonl";

/// Values given on the command line. `None` / empty means "not given".
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub target: Option<PathBuf>,
    pub baseline: Option<PathBuf>,
    pub log: Option<PathBuf>,
    /// Appended after the configured patterns, so they take precedence.
    pub exclude: Vec<String>,
    pub hash_algorithm: Option<String>,
    pub debounce_ms: Option<u64>,
    pub retry_ms: Option<u64>,
    pub force_polling: bool,
}

impl RawConfigFile {
    /// Layer command-line values over the file's.
    pub fn with_overrides(mut self, overrides: &Overrides) -> Self {
        if let Some(target) = &overrides.target {
            self.target = Some(target.clone());
        }
        if let Some(baseline) = &overrides.baseline {
            self.baseline = Some(baseline.clone());
        }
        if let Some(log) = &overrides.log {
            self.log = Some(log.clone());
        }
        self.exclude.extend(overrides.exclude.iter().cloned());
        if let Some(algorithm) = &overrides.hash_algorithm {
            self.hash_algorithm = Some(algorithm.clone());
        }
        if let Some(ms) = overrides.debounce_ms {
            self.watch.debounce_ms = ms;
        }
        if let Some(ms) = overrides.retry_ms {
            self.watch.retry_ms = ms;
        }
        if overrides.force_polling {
            self.watch.mode = "polling".to_string();
        }
        self
    }

    /// Resolve relative paths from the file against `base` (the directory
    /// holding the config file).
    pub fn rebase(mut self, base: &Path) -> Self {
        let join = |p: Option<PathBuf>| p.map(|p| if p.is_relative() { base.join(p) } else { p });
        self.target = join(self.target.take());
        self.baseline = join(self.baseline.take());
        self.log = join(self.log.take());
        self
    }
}

/// Fully validated configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub target: PathBuf,
    pub baseline: PathBuf,
    pub log: PathBuf,
    /// User patterns in declaration order (without the implicit ones).
    pub exclude: Vec<String>,
    pub hash_algorithm: HashAlgorithm,
    pub debounce: Duration,
    pub retry_delay: Duration,
    pub poll_interval: Duration,
    pub watch_mode: WatchMode,
    pub reconcile_on_start: bool,
    pub workers: usize,
    pub case_insensitive: bool,
}

impl Settings {
    /// User patterns plus anchored patterns for the baseline, its backups
    /// and the log file when they live inside the target. These go last, so
    /// no `!pattern` can re-include them.
    pub fn effective_exclusions(&self) -> Vec<String> {
        let mut patterns = self.exclude.clone();
        let Ok(root) = self.target.canonicalize() else {
            return patterns;
        };
        if let Some(key) = key_inside(&root, &self.baseline, self.case_insensitive) {
            let escaped = escape_glob(&key);
            patterns.push(format!("/{escaped}"));
            patterns.push(format!("/{escaped}.bak.*"));
        }
        if let Some(key) = key_inside(&root, &self.log, self.case_insensitive) {
            patterns.push(format!("/{}", escape_glob(&key)));
        }
        patterns
    }

    pub fn matcher(&self) -> Result<ExclusionMatcher> {
        ExclusionMatcher::build(&self.effective_exclusions(), self.case_insensitive)
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            algorithm: self.hash_algorithm,
            case_insensitive: self.case_insensitive,
            workers: self.workers,
        }
    }

    /// Watch options; `algorithm` must be the baseline's, not necessarily the
    /// configured one.
    pub fn watch_options(&self, algorithm: HashAlgorithm) -> WatchOptions {
        WatchOptions {
            debounce: self.debounce,
            retry_delay: self.retry_delay,
            algorithm,
            case_insensitive: self.case_insensitive,
        }
    }
}

/// Key of `file` relative to `root`, if it is inside it. The file itself
/// need not exist yet.
fn key_inside(root: &Path, file: &Path, case_insensitive: bool) -> Option<String> {
    let abs = if file.is_absolute() {
        file.to_path_buf()
    } else {
        std::env::current_dir().ok()?.join(file)
    };
    let name = abs.file_name()?;
    let parent = abs.parent()?;
    let parent = parent.canonicalize().unwrap_or_else(|_| parent.to_path_buf());
    let full = parent.join(name);
    normalize_key(full.strip_prefix(root).ok()?, case_insensitive)
}

/// Make a literal path safe to use as a glob.
fn escape_glob(literal: &str) -> String {
    let mut out = String::with_capacity(literal.len());
    for c in literal.chars() {
        match c {
            '*' | '?' | '[' | ']' | '{' | '}' => {
                out.push('[');
                out.push(c);
                out.push(']');
            }
            _ => out.push(c),
        }
    }
    out
}
