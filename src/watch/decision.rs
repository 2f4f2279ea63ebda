// src/watch/decision.rs

use crate::baseline::{ChangeEntry, ChangeKind};
use crate::watch::event::EventKind;

/// Outcome of resolving one path after its debounce window closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchDecision {
    pub entry: ChangeEntry,
    /// The file exists but could not be read, even after the retry.
    pub unreadable: bool,
    /// A retry was needed to reach this decision.
    pub retried: bool,
    /// Last raw event kind seen for the path. Diagnostic only.
    pub trigger: EventKind,
}

impl WatchDecision {
    pub fn path(&self) -> &str {
        self.entry.path()
    }

    pub fn kind(&self) -> ChangeKind {
        self.entry.kind()
    }
}

/// Keys still pending when the engine stopped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Sorted, unique.
    pub deferred: Vec<String>,
}
