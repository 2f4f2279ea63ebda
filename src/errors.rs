// src/errors.rs

//! Crate-wide error type and result alias.
//!
//! Only structural failures live here. A file that cannot be read is never an
//! error at this level: the fingerprinter reports it as
//! [`Fingerprint::Unreadable`](crate::baseline::Fingerprint) instead.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FimError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Baseline not found at {0:?}; run `fimwatch init` first")]
    BaselineNotFound(PathBuf),

    #[error("Baseline schema mismatch: expected version {expected}, found {found}")]
    SchemaMismatch { expected: u32, found: String },

    #[error("Corrupt baseline: {0}")]
    CorruptBaseline(String),

    #[error("Unsupported hash algorithm: {0}")]
    UnsupportedHashAlgorithm(String),

    #[error("Invalid target root {path:?}: {reason}")]
    InvalidTarget { path: PathBuf, reason: String },

    #[error("Invalid exclusion pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("File watcher error: {0}")]
    WatcherError(#[from] notify::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, FimError>;
