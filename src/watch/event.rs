// src/watch/event.rs

//! Raw filesystem events and their normalization.
//!
//! Every source (native notifications, the poller, tests) produces
//! [`RawEvent`]s. [`normalize`] is the only place a rename is split up.

use std::fmt;
use std::path::PathBuf;

use notify::event::{ModifyKind, RenameMode};

/// What the OS (or the poller) reported, before any interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawEvent {
    Created(PathBuf),
    Modified(PathBuf),
    Deleted(PathBuf),
    Renamed { from: PathBuf, to: PathBuf },
}

/// Single-path event kind after normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Created,
    Modified,
    Deleted,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Created => "created",
            EventKind::Modified => "modified",
            EventKind::Deleted => "deleted",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedEvent {
    pub kind: EventKind,
    pub path: PathBuf,
}

impl NormalizedEvent {
    fn new(kind: EventKind, path: PathBuf) -> Self {
        Self { kind, path }
    }
}

/// Split a raw event into single-path events. A rename becomes a deletion
/// of the old path followed by a creation of the new one.
pub fn normalize(event: RawEvent) -> Vec<NormalizedEvent> {
    match event {
        RawEvent::Created(p) => vec![NormalizedEvent::new(EventKind::Created, p)],
        RawEvent::Modified(p) => vec![NormalizedEvent::new(EventKind::Modified, p)],
        RawEvent::Deleted(p) => vec![NormalizedEvent::new(EventKind::Deleted, p)],
        RawEvent::Renamed { from, to } => vec![
            NormalizedEvent::new(EventKind::Deleted, from),
            NormalizedEvent::new(EventKind::Created, to),
        ],
    }
}

/// Classify a `notify` event. Access and other informational kinds yield
/// nothing.
pub fn from_notify(event: &notify::Event) -> Vec<RawEvent> {
    use notify::EventKind as Nk;

    let paths = event.paths.iter().cloned();
    match &event.kind {
        Nk::Create(_) => paths.map(RawEvent::Created).collect(),
        Nk::Remove(_) => paths.map(RawEvent::Deleted).collect(),
        Nk::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::Both if event.paths.len() >= 2 => vec![RawEvent::Renamed {
                from: event.paths[0].clone(),
                to: event.paths[1].clone(),
            }],
            RenameMode::From => paths.map(RawEvent::Deleted).collect(),
            RenameMode::To => paths.map(RawEvent::Created).collect(),
            // Direction unknown (FSEvents). The engine decides from what is on
            // disk, expanding directories either way.
            _ => paths.map(RawEvent::Modified).collect(),
        },
        Nk::Modify(_) => paths.map(RawEvent::Modified).collect(),
        Nk::Access(_) | Nk::Any | Nk::Other => Vec::new(),
    }
}
