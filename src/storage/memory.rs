// src/storage/memory.rs

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use crate::baseline::Snapshot;
use crate::errors::{FimError, Result};
use crate::storage::{LogRecord, Storage};

#[derive(Debug, Default)]
struct Inner {
    baseline: Option<Snapshot>,
    backups: Vec<Snapshot>,
    log: Vec<LogRecord>,
}

/// Keeps everything in memory only.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_baseline(snapshot: Snapshot) -> Self {
        let store = Self::new();
        store.lock().baseline = Some(snapshot);
        store
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn log_records(&self) -> Vec<LogRecord> {
        self.lock().log.clone()
    }

    pub fn backups(&self) -> Vec<Snapshot> {
        self.lock().backups.clone()
    }
}

impl Storage for MemoryStore {
    fn load_baseline(&self) -> Result<Snapshot> {
        self.lock()
            .baseline
            .clone()
            .ok_or_else(|| FimError::BaselineNotFound(PathBuf::from("<memory>")))
    }

    fn save_baseline(&self, snapshot: &Snapshot) -> Result<()> {
        self.lock().baseline = Some(snapshot.clone());
        Ok(())
    }

    fn append_log_record(&self, record: &LogRecord) -> Result<()> {
        self.lock().log.push(record.clone());
        Ok(())
    }

    fn backup_baseline(&self) -> Result<Option<PathBuf>> {
        let mut inner = self.lock();
        match inner.baseline.clone() {
            Some(snapshot) => {
                inner.backups.push(snapshot);
                Ok(Some(PathBuf::from(format!(
                    "<memory>.bak.{}",
                    inner.backups.len()
                ))))
            }
            None => Ok(None),
        }
    }
}
