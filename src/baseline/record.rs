// src/baseline/record.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fs::FileMeta;
use crate::types::HashAlgorithm;

/// Current on-disk baseline layout.
pub const SCHEMA_VERSION: u32 = 1;

/// Hash value recorded for a file that exists but could not be read.
pub const UNREADABLE_HASH: &str = "unreadable";

/// Fingerprint of one monitored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Normalized relative key (`/`-separated, never absolute).
    pub path: String,
    /// Hex digest, or [`UNREADABLE_HASH`].
    pub hash: String,
    pub size: u64,
    /// Seconds since the Unix epoch.
    pub mtime: i64,
}

impl FileRecord {
    /// Placeholder record for a file that is present but unreadable.
    ///
    /// Size and mtime are kept when the metadata was still reachable.
    pub fn unreadable(path: impl Into<String>, meta: Option<FileMeta>) -> Self {
        let meta = meta.unwrap_or(FileMeta { len: 0, mtime: 0 });
        Self {
            path: path.into(),
            hash: UNREADABLE_HASH.to_string(),
            size: meta.len,
            mtime: meta.mtime,
        }
    }

    pub fn is_unreadable(&self) -> bool {
        self.hash == UNREADABLE_HASH
    }
}

/// A captured baseline: every monitored file at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub schema_version: u32,
    pub created_at: DateTime<Utc>,
    /// Absolute root at capture time. Informational only; keys never
    /// depend on it.
    pub target_root: String,
    pub hash_algorithm: HashAlgorithm,
    pub files: BTreeMap<String, FileRecord>,
}

impl Snapshot {
    pub fn new(
        target_root: impl Into<String>,
        hash_algorithm: HashAlgorithm,
        files: BTreeMap<String, FileRecord>,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            created_at: Utc::now(),
            target_root: target_root.into(),
            hash_algorithm,
            files,
        }
    }

    pub fn get(&self, key: &str) -> Option<&FileRecord> {
        self.files.get(key)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Tracked keys strictly below directory key `dir`.
    pub fn keys_under<'a>(&'a self, dir: &str) -> impl Iterator<Item = &'a String> + 'a {
        let prefix = format!("{dir}/");
        self.files
            .range(prefix.clone()..)
            .take_while(move |(k, _)| k.starts_with(&prefix))
            .map(|(k, _)| k)
    }
}
