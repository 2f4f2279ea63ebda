#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;

use fimwatch::baseline::{FileRecord, Snapshot, hash_reader};
use fimwatch::config::{RawConfigFile, Settings};
use fimwatch::fs::mock::MOCK_MTIME;
use fimwatch::types::HashAlgorithm;

/// Digest of `content` the way the scanner would record it.
pub fn digest(content: &[u8], algorithm: HashAlgorithm) -> String {
    let mut reader = content;
    hash_reader(&mut reader, algorithm).expect("hashing an in-memory buffer cannot fail")
}

/// Record for a file written through `MockFileSystem::add_file`.
pub fn record(key: &str, content: &[u8]) -> FileRecord {
    FileRecord {
        path: key.to_string(),
        hash: digest(content, HashAlgorithm::Sha256),
        size: content.len() as u64,
        mtime: MOCK_MTIME,
    }
}

/// Builder for `Snapshot` to simplify test setup.
pub struct SnapshotBuilder {
    target_root: String,
    algorithm: HashAlgorithm,
    files: BTreeMap<String, FileRecord>,
}

impl SnapshotBuilder {
    pub fn new(target_root: &str) -> Self {
        Self {
            target_root: target_root.to_string(),
            algorithm: HashAlgorithm::Sha256,
            files: BTreeMap::new(),
        }
    }

    pub fn algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Track `key` with the fingerprint of `content`.
    pub fn file(mut self, key: &str, content: &[u8]) -> Self {
        let mut rec = record(key, content);
        rec.hash = digest(content, self.algorithm);
        self.files.insert(key.to_string(), rec);
        self
    }

    pub fn record(mut self, rec: FileRecord) -> Self {
        self.files.insert(rec.path.clone(), rec);
        self
    }

    pub fn build(self) -> Snapshot {
        Snapshot::new(self.target_root, self.algorithm, self.files)
    }
}

/// Builder for `Settings`, going through the same validation as a config file.
pub struct SettingsBuilder {
    raw: RawConfigFile,
}

impl SettingsBuilder {
    pub fn new(target: impl Into<PathBuf>) -> Self {
        let mut raw = RawConfigFile::default();
        raw.target = Some(target.into());
        raw.scan.case_insensitive = Some(false);
        raw.scan.workers = 2;
        Self { raw }
    }

    pub fn baseline(mut self, path: impl Into<PathBuf>) -> Self {
        self.raw.baseline = Some(path.into());
        self
    }

    pub fn log(mut self, path: impl Into<PathBuf>) -> Self {
        self.raw.log = Some(path.into());
        self
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        self.raw.exclude.push(pattern.to_string());
        self
    }

    pub fn algorithm(mut self, name: &str) -> Self {
        self.raw.hash_algorithm = Some(name.to_string());
        self
    }

    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.raw.watch.debounce_ms = ms;
        self
    }

    pub fn retry_ms(mut self, ms: u64) -> Self {
        self.raw.watch.retry_ms = ms;
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.raw.watch.poll_interval_ms = ms;
        self
    }

    pub fn mode(mut self, mode: &str) -> Self {
        self.raw.watch.mode = mode.to_string();
        self
    }

    pub fn reconcile_on_start(mut self, val: bool) -> Self {
        self.raw.watch.reconcile_on_start = val;
        self
    }

    pub fn case_insensitive(mut self, val: bool) -> Self {
        self.raw.scan.case_insensitive = Some(val);
        self
    }

    pub fn build(self) -> Settings {
        Settings::try_from(self.raw).expect("Failed to build valid settings from builder")
    }
}
