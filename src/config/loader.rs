// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::RawConfigFile;
use crate::config::settings::{Overrides, Settings};
use crate::errors::{FimError, Result};

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "fimwatch.toml";

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; values are checked later, once
/// command-line overrides have been applied. Relative paths inside the file
/// are resolved against the file's own directory.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config.rebase(&config_dir(path)))
}

/// Find and load the config file.
///
/// - An explicit path must exist.
/// - Otherwise `fimwatch.toml` in the working directory is used if present,
///   and built-in defaults if not.
pub fn load_config(explicit: Option<&Path>) -> Result<RawConfigFile> {
    match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(FimError::ConfigError(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            load_from_path(path)
        }
        None => {
            let path = default_config_path();
            if path.exists() {
                debug!(path = %path.display(), "using default config file");
                load_from_path(&path)
            } else {
                debug!("no config file; using defaults");
                Ok(RawConfigFile::default())
            }
        }
    }
}

/// Load, layer command-line overrides on top, and validate.
///
/// This is the recommended entry point for the rest of the application.
pub fn load_and_resolve(explicit: Option<&Path>, overrides: &Overrides) -> Result<Settings> {
    let raw = load_config(explicit)?.with_overrides(overrides);
    Settings::try_from(raw)
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_FILE)
}

/// Directory holding `path`, or `.` for a bare file name.
fn config_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
