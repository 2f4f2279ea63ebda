// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

/// Configuration as read from `fimwatch.toml`.
///
/// ```toml
/// target = "."
/// baseline = "baseline.json"
/// log = "changes_log.jsonl"
/// exclude = ["*.log", "!keep.log"]
/// hash_algorithm = "sha256"
///
/// [watch]
/// debounce_ms = 600
/// retry_ms = 500
/// poll_interval_ms = 2000
/// mode = "auto"
/// reconcile_on_start = true
///
/// [scan]
/// workers = 4
/// case_insensitive = false
/// ```
///
/// Every key is optional. Values are checked when the file (with any
/// command-line overrides applied) is turned into
/// [`Settings`](crate::config::Settings).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    /// Directory to monitor.
    #[serde(default)]
    pub target: Option<PathBuf>,

    /// Baseline JSON file.
    #[serde(default)]
    pub baseline: Option<PathBuf>,

    /// JSON Lines change log.
    #[serde(default)]
    pub log: Option<PathBuf>,

    /// Ordered exclusion patterns; `!pattern` re-includes.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// `"sha256"` (default) or `"blake3"`.
    #[serde(default)]
    pub hash_algorithm: Option<String>,

    #[serde(default)]
    pub watch: WatchSection,

    #[serde(default)]
    pub scan: ScanSection,
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchSection {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    #[serde(default = "default_retry_ms")]
    pub retry_ms: u64,

    /// Rescan interval when polling.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// `"auto"`, `"native"` or `"polling"`.
    #[serde(default = "default_mode")]
    pub mode: String,

    /// Diff the tree against the baseline before watching, to catch changes
    /// made while the monitor was down.
    #[serde(default = "default_true")]
    pub reconcile_on_start: bool,
}

fn default_debounce_ms() -> u64 {
    600
}

fn default_retry_ms() -> u64 {
    500
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_mode() -> String {
    "auto".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            retry_ms: default_retry_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            mode: default_mode(),
            reconcile_on_start: default_true(),
        }
    }
}

/// `[scan]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScanSection {
    /// Fingerprinting threads.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Fold keys to lowercase. Defaults to the platform convention
    /// (on for Windows and macOS).
    #[serde(default)]
    pub case_insensitive: Option<bool>,
}

fn default_workers() -> usize {
    4
}

impl Default for ScanSection {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            case_insensitive: None,
        }
    }
}
