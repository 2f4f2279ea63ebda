// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Digest used to fingerprint file contents.
///
/// The identifier string (`"sha256"`, `"blake3"`) is what gets written into
/// the baseline's `hash_algorithm` field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Blake3,
}

impl HashAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Blake3 => "blake3",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(HashAlgorithm::Sha256),
            "blake3" => Ok(HashAlgorithm::Blake3),
            other => Err(format!(
                "invalid hash_algorithm: {other} (expected \"sha256\" or \"blake3\")"
            )),
        }
    }
}

/// How the watch command receives filesystem changes.
///
/// - `Auto`: native notifications, falling back to polling if the platform
///   watcher cannot be started (default).
/// - `Native`: native notifications only; failure to start is fatal.
/// - `Polling`: periodic rescans only (e.g. network mounts).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchMode {
    #[default]
    Auto,
    Native,
    Polling,
}

impl FromStr for WatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(WatchMode::Auto),
            "native" => Ok(WatchMode::Native),
            "polling" | "poll" => Ok(WatchMode::Polling),
            other => Err(format!(
                "invalid watch mode: {other} (expected \"auto\", \"native\" or \"polling\")"
            )),
        }
    }
}
