// src/storage/mod.rs

//! Baseline persistence and the change log.

use std::path::PathBuf;

use crate::baseline::Snapshot;
use crate::errors::Result;

pub mod json_store;
pub mod memory;
pub mod record;

pub use json_store::JsonStore;
pub use memory::MemoryStore;
pub use record::{LogEvent, LogRecord};

/// Where baselines and log records live.
pub trait Storage: Send + Sync {
    /// Load the current baseline. A missing baseline or an unknown schema
    /// version is an error.
    fn load_baseline(&self) -> Result<Snapshot>;

    /// Replace the current baseline.
    fn save_baseline(&self, snapshot: &Snapshot) -> Result<()>;

    fn append_log_record(&self, record: &LogRecord) -> Result<()>;

    /// Keep a copy of the current baseline before it is replaced. Returns
    /// where the copy went, or `None` if there was nothing to back up.
    fn backup_baseline(&self) -> Result<Option<PathBuf>>;
}
