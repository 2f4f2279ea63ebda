// src/config/mod.rs

//! Configuration loading and validation for fimwatch.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Layer command-line overrides and expose resolved values (`settings.rs`).
//! - Validate ranges, algorithm names and patterns (`validate.rs`).

pub mod loader;
pub mod model;
pub mod settings;
pub mod validate;

pub use loader::{DEFAULT_CONFIG_FILE, load_and_resolve, load_config, load_from_path};
pub use model::{RawConfigFile, ScanSection, WatchSection};
pub use settings::{Overrides, Settings};
