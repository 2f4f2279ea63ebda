// src/storage/json_store.rs

//! File-backed storage.
//!
//! - The baseline is one pretty-printed JSON document, replaced atomically
//!   (temp file in the same directory, then rename).
//! - Backups sit next to it as `<baseline>.bak.<YYYYmmddTHHMMSSZ>`.
//! - The change log is JSON Lines, append-only.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::baseline::{SCHEMA_VERSION, Snapshot};
use crate::errors::{FimError, Result};
use crate::storage::{LogRecord, Storage};
use crate::types::HashAlgorithm;

#[derive(Debug, Clone)]
pub struct JsonStore {
    baseline_path: PathBuf,
    log_path: PathBuf,
}

impl JsonStore {
    pub fn new(baseline_path: impl Into<PathBuf>, log_path: impl Into<PathBuf>) -> Self {
        Self {
            baseline_path: baseline_path.into(),
            log_path: log_path.into(),
        }
    }

    pub fn baseline_path(&self) -> &Path {
        &self.baseline_path
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn baseline_exists(&self) -> bool {
        self.baseline_path.exists()
    }
}

/// Parent directory of `path`, treating a bare file name as `.`.
fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Validate the header fields before deserializing the whole document, so an
/// unknown schema is reported as such instead of as a shape error.
fn parse_baseline(text: &str) -> Result<Snapshot> {
    let value: serde_json::Value = serde_json::from_str(text)?;

    match value.get("schema_version") {
        Some(v) if v.as_u64() == Some(u64::from(SCHEMA_VERSION)) => {}
        Some(v) => {
            return Err(FimError::SchemaMismatch {
                expected: SCHEMA_VERSION,
                found: v.to_string(),
            });
        }
        None => {
            return Err(FimError::SchemaMismatch {
                expected: SCHEMA_VERSION,
                found: "missing".to_string(),
            });
        }
    }

    let algorithm = value
        .get("hash_algorithm")
        .and_then(|v| v.as_str())
        .ok_or_else(|| FimError::CorruptBaseline("missing hash_algorithm".to_string()))?;
    algorithm
        .parse::<HashAlgorithm>()
        .map_err(|_| FimError::UnsupportedHashAlgorithm(algorithm.to_string()))?;

    let snapshot: Snapshot =
        serde_json::from_value(value).map_err(|e| FimError::CorruptBaseline(e.to_string()))?;

    if let Some((key, record)) = snapshot.files.iter().find(|(k, r)| **k != r.path) {
        return Err(FimError::CorruptBaseline(format!(
            "entry {key:?} records path {:?}",
            record.path
        )));
    }

    Ok(snapshot)
}

impl Storage for JsonStore {
    fn load_baseline(&self) -> Result<Snapshot> {
        if !self.baseline_path.exists() {
            return Err(FimError::BaselineNotFound(self.baseline_path.clone()));
        }
        let text = fs::read_to_string(&self.baseline_path)?;
        let snapshot = parse_baseline(&text)?;
        debug!(
            path = %self.baseline_path.display(),
            files = snapshot.len(),
            "loaded baseline"
        );
        Ok(snapshot)
    }

    fn save_baseline(&self, snapshot: &Snapshot) -> Result<()> {
        let dir = parent_dir(&self.baseline_path);
        fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, snapshot)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.baseline_path).map_err(|e| e.error)?;

        info!(
            path = %self.baseline_path.display(),
            files = snapshot.len(),
            "baseline written"
        );
        Ok(())
    }

    fn append_log_record(&self, record: &LogRecord) -> Result<()> {
        fs::create_dir_all(parent_dir(&self.log_path))?;

        let line = serde_json::to_string(record)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    fn backup_baseline(&self) -> Result<Option<PathBuf>> {
        if !self.baseline_path.exists() {
            return Ok(None);
        }

        let stamp = Utc::now().format("%Y%m%dT%H%M%SZ");
        let base = format!("{}.bak.{stamp}", self.baseline_path.display());
        let mut backup = PathBuf::from(&base);
        let mut n = 1;
        while backup.exists() {
            backup = PathBuf::from(format!("{base}-{n}"));
            n += 1;
        }

        fs::copy(&self.baseline_path, &backup)?;
        info!(backup = %backup.display(), "previous baseline backed up");
        Ok(Some(backup))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baseline::FileRecord;
    use crate::storage::LogEvent;
    use std::collections::BTreeMap;

    fn sample() -> Snapshot {
        let record = FileRecord {
            path: "a.txt".into(),
            hash: "ab".into(),
            size: 2,
            mtime: 5,
        };
        Snapshot::new(
            "/t",
            HashAlgorithm::Sha256,
            BTreeMap::from([("a.txt".to_string(), record)]),
        )
    }

    #[test]
    fn save_then_load_preserves_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path().join("nested/baseline.json"), dir.path().join("log.jsonl"));

        let snap = sample();
        store.save_baseline(&snap).unwrap();
        assert_eq!(store.load_baseline().unwrap(), snap);
    }

    #[test]
    fn missing_baseline_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path().join("b.json"), dir.path().join("l.jsonl"));
        assert!(matches!(store.load_baseline(), Err(FimError::BaselineNotFound(_))));
    }

    #[test]
    fn foreign_schema_version_fails_loudly() {
        let mut value = serde_json::to_value(sample()).unwrap();
        value["schema_version"] = serde_json::json!(2);
        let err = parse_baseline(&value.to_string()).unwrap_err();
        assert!(matches!(err, FimError::SchemaMismatch { expected: 1, .. }));

        value.as_object_mut().unwrap().remove("schema_version");
        let err = parse_baseline(&value.to_string()).unwrap_err();
        assert!(matches!(err, FimError::SchemaMismatch { .. }));
    }

    #[test]
    fn unknown_algorithm_is_rejected() {
        let mut value = serde_json::to_value(sample()).unwrap();
        value["hash_algorithm"] = serde_json::json!("md5");
        let err = parse_baseline(&value.to_string()).unwrap_err();
        assert!(matches!(err, FimError::UnsupportedHashAlgorithm(a) if a == "md5"));
    }

    #[test]
    fn mismatched_entry_key_is_corrupt() {
        let mut value = serde_json::to_value(sample()).unwrap();
        value["files"]["a.txt"]["path"] = serde_json::json!("b.txt");
        let err = parse_baseline(&value.to_string()).unwrap_err();
        assert!(matches!(err, FimError::CorruptBaseline(_)));
    }

    #[test]
    fn log_is_appended_one_object_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("logs/changes.jsonl");
        let store = JsonStore::new(dir.path().join("b.json"), &log);

        store
            .append_log_record(&LogRecord::summary(LogEvent::Init, "/t", 1, 0))
            .unwrap();
        store
            .append_log_record(&LogRecord::summary(LogEvent::Check, "/t", 1, 0))
            .unwrap();

        let text = std::fs::read_to_string(&log).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let second: LogRecord = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.event, LogEvent::Check);
    }

    #[test]
    fn backup_copies_current_baseline() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path().join("baseline.json"), dir.path().join("l.jsonl"));
        assert_eq!(store.backup_baseline().unwrap(), None);

        store.save_baseline(&sample()).unwrap();
        let first = store.backup_baseline().unwrap().unwrap();
        let second = store.backup_baseline().unwrap().unwrap();
        assert_ne!(first, second);
        assert!(first.to_string_lossy().contains("baseline.json.bak."));
        assert_eq!(
            std::fs::read(&first).unwrap(),
            std::fs::read(store.baseline_path()).unwrap()
        );
    }
}
