// src/commands/mod.rs

//! The `init`, `check`, `update` and `watch` commands.
//!
//! Commands do the work and write log records; printing is left to
//! [`crate::report`] so they can be driven from tests without a terminal.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::baseline::resolve_root;
use crate::config::Settings;
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::storage::Storage;

pub mod check;
pub mod init;
pub mod update;
pub mod watch;

pub use check::{CheckReport, run_check};
pub use init::{InitOutcome, run_init};
pub use update::{UpdateOutcome, run_update};
pub use watch::{WatchSummary, run_watch};

/// Everything a command needs.
#[derive(Clone)]
pub struct Context {
    pub settings: Settings,
    pub fs: Arc<dyn FileSystem>,
    pub store: Arc<dyn Storage>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Context {
    pub fn new(settings: Settings, fs: Arc<dyn FileSystem>, store: Arc<dyn Storage>) -> Self {
        Self {
            settings,
            fs,
            store,
        }
    }

    /// Canonical target root; fails if it is not a directory.
    pub fn root(&self) -> Result<PathBuf> {
        resolve_root(self.fs.as_ref(), &self.settings.target)
    }
}
