// src/baseline/compare.rs

//! Pure baseline diffing.
//!
//! A file is `Modified` only when its hash differs. Size and mtime are carried
//! along for reporting but never decide anything.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use crate::baseline::record::{FileRecord, Snapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Created => "created",
            ChangeKind::Modified => "modified",
            ChangeKind::Deleted => "deleted",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One detected change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEntry {
    Created { path: String, record: FileRecord },
    Modified { path: String, record: FileRecord },
    Deleted { path: String },
}

impl ChangeEntry {
    pub fn path(&self) -> &str {
        match self {
            ChangeEntry::Created { path, .. }
            | ChangeEntry::Modified { path, .. }
            | ChangeEntry::Deleted { path } => path,
        }
    }

    pub fn kind(&self) -> ChangeKind {
        match self {
            ChangeEntry::Created { .. } => ChangeKind::Created,
            ChangeEntry::Modified { .. } => ChangeKind::Modified,
            ChangeEntry::Deleted { .. } => ChangeKind::Deleted,
        }
    }

    /// The new record, for creations and modifications.
    pub fn record(&self) -> Option<&FileRecord> {
        match self {
            ChangeEntry::Created { record, .. } | ChangeEntry::Modified { record, .. } => {
                Some(record)
            }
            ChangeEntry::Deleted { .. } => None,
        }
    }
}

/// Diff two snapshots. Output is sorted by path.
pub fn compare(old: &Snapshot, new: &Snapshot) -> Vec<ChangeEntry> {
    compare_files(&old.files, &new.files)
}

/// Diff two file maps. Output is sorted by path.
pub fn compare_files(
    old: &BTreeMap<String, FileRecord>,
    new: &BTreeMap<String, FileRecord>,
) -> Vec<ChangeEntry> {
    let keys: BTreeSet<&String> = old.keys().chain(new.keys()).collect();
    keys.into_iter()
        .filter_map(|key| compare_one_keyed(key, old.get(key), new.get(key)))
        .collect()
}

/// Single-path form used by the watch engine. `None` means no change.
pub fn compare_one(old: Option<&FileRecord>, new: Option<&FileRecord>) -> Option<ChangeEntry> {
    let key = new.or(old)?.path.clone();
    compare_one_keyed(&key, old, new)
}

fn compare_one_keyed(
    key: &str,
    old: Option<&FileRecord>,
    new: Option<&FileRecord>,
) -> Option<ChangeEntry> {
    match (old, new) {
        (None, None) => None,
        (None, Some(record)) => Some(ChangeEntry::Created {
            path: key.to_string(),
            record: record.clone(),
        }),
        (Some(_), None) => Some(ChangeEntry::Deleted {
            path: key.to_string(),
        }),
        (Some(old), Some(new)) if old.hash != new.hash => Some(ChangeEntry::Modified {
            path: key.to_string(),
            record: new.clone(),
        }),
        (Some(_), Some(_)) => None,
    }
}

/// Per-kind counts of a change set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeSummary {
    pub created: usize,
    pub modified: usize,
    pub deleted: usize,
}

impl ChangeSummary {
    pub fn of(changes: &[ChangeEntry]) -> Self {
        changes.iter().fold(Self::default(), |mut acc, c| {
            match c.kind() {
                ChangeKind::Created => acc.created += 1,
                ChangeKind::Modified => acc.modified += 1,
                ChangeKind::Deleted => acc.deleted += 1,
            }
            acc
        })
    }

    pub fn total(&self) -> usize {
        self.created + self.modified + self.deleted
    }

    pub fn is_clean(&self) -> bool {
        self.total() == 0
    }
}
