// src/watch/resolve.rs

//! Turn one debounced path into at most one [`WatchDecision`].

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::baseline::{ChangeEntry, FileRecord, Fingerprint, Snapshot, compare_one, fingerprint};
use crate::fs::{EntryKind, FileMeta, FileSystem};
use crate::types::HashAlgorithm;
use crate::watch::debounce::PendingResolve;
use crate::watch::decision::WatchDecision;

/// What is on disk at a path right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    Present(FileRecord),
    Absent,
    Directory,
    /// Exists but could not be read. Metadata is kept when it was reachable.
    Unreadable(Option<FileMeta>),
}

/// Synchronous observation of `abs_path`.
///
/// Dangling links and special files count as absent.
pub fn observe(
    fs: &dyn FileSystem,
    abs_path: &Path,
    key: &str,
    algorithm: HashAlgorithm,
) -> Observation {
    match fs.entry_kind(abs_path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Observation::Absent,
        Err(e) => {
            debug!(key, error = %e, "cannot stat path");
            Observation::Unreadable(None)
        }
        Ok(EntryKind::Dir) | Ok(EntryKind::DirLink) => Observation::Directory,
        Ok(EntryKind::Other) => Observation::Absent,
        Ok(EntryKind::File) | Ok(EntryKind::FileLink) => {
            match fingerprint(fs, abs_path, key, algorithm) {
                Fingerprint::Ok(record) => Observation::Present(record),
                Fingerprint::Unreadable(io::ErrorKind::NotFound) => Observation::Absent,
                Fingerprint::Unreadable(_) => Observation::Unreadable(fs.metadata(abs_path).ok()),
            }
        }
    }
}

/// Resolves pending keys against the shared baseline.
#[derive(Debug, Clone)]
pub struct Resolver {
    fs: Arc<dyn FileSystem>,
    baseline: Arc<Snapshot>,
    algorithm: HashAlgorithm,
    retry_delay: Duration,
}

impl Resolver {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        baseline: Arc<Snapshot>,
        algorithm: HashAlgorithm,
        retry_delay: Duration,
    ) -> Self {
        Self {
            fs,
            baseline,
            algorithm,
            retry_delay,
        }
    }

    /// Observe the path, retrying once after `retry_delay` if it is
    /// unreadable, and compare the result with the baseline entry.
    ///
    /// `None` means nothing changed (or the path is a directory).
    pub async fn resolve(&self, pending: &PendingResolve) -> Option<WatchDecision> {
        let mut retried = false;
        let mut observation = self.observe(pending).await;

        if matches!(observation, Observation::Unreadable(_)) {
            debug!(key = %pending.key, delay = ?self.retry_delay, "unreadable; retrying once");
            tokio::time::sleep(self.retry_delay).await;
            retried = true;
            observation = self.observe(pending).await;
        }

        let old = self.baseline.get(&pending.key);
        let (entry, unreadable) = match observation {
            Observation::Directory => return None,
            Observation::Absent => (compare_one(old, None)?, false),
            Observation::Present(record) => (compare_one(old, Some(&record))?, false),
            Observation::Unreadable(meta) => {
                if self.still_exists(&pending.abs_path).await {
                    warn!(key = %pending.key, "file still unreadable after retry");
                    let entry = ChangeEntry::Modified {
                        path: pending.key.clone(),
                        record: FileRecord::unreadable(pending.key.clone(), meta),
                    };
                    (entry, true)
                } else {
                    (compare_one(old, None)?, false)
                }
            }
        };

        Some(WatchDecision {
            entry,
            unreadable,
            retried,
            trigger: pending.kind,
        })
    }

    async fn observe(&self, pending: &PendingResolve) -> Observation {
        let fs = Arc::clone(&self.fs);
        let abs_path = pending.abs_path.clone();
        let key = pending.key.clone();
        let algorithm = self.algorithm;

        match tokio::task::spawn_blocking(move || observe(fs.as_ref(), &abs_path, &key, algorithm))
            .await
        {
            Ok(observation) => observation,
            Err(e) => {
                warn!(key = %pending.key, error = %e, "observation task failed");
                Observation::Unreadable(None)
            }
        }
    }

    async fn still_exists(&self, abs_path: &Path) -> bool {
        let fs = Arc::clone(&self.fs);
        let abs_path: PathBuf = abs_path.to_path_buf();
        tokio::task::spawn_blocking(move || fs.exists(&abs_path))
            .await
            .unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baseline::ChangeKind;
    use crate::fs::mock::MockFileSystem;
    use crate::watch::event::EventKind;
    use std::collections::BTreeMap;

    fn resolver(fs: &MockFileSystem, baseline: BTreeMap<String, FileRecord>) -> Resolver {
        let snapshot = Snapshot::new("/t", HashAlgorithm::Sha256, baseline);
        Resolver::new(
            Arc::new(fs.clone()),
            Arc::new(snapshot),
            HashAlgorithm::Sha256,
            Duration::from_millis(5),
        )
    }

    fn pending(key: &str, kind: EventKind) -> PendingResolve {
        PendingResolve {
            key: key.into(),
            kind,
            abs_path: PathBuf::from(format!("/t/{key}")),
        }
    }

    fn tracked(fs: &MockFileSystem, key: &str) -> BTreeMap<String, FileRecord> {
        let record = fingerprint(fs, Path::new(&format!("/t/{key}")), key, HashAlgorithm::Sha256)
            .into_record()
            .unwrap();
        BTreeMap::from([(key.to_string(), record)])
    }

    #[tokio::test]
    async fn unchanged_file_yields_nothing() {
        let fs = MockFileSystem::new();
        fs.add_file("/t/a", "same");
        let r = resolver(&fs, tracked(&fs, "a"));
        assert_eq!(r.resolve(&pending("a", EventKind::Modified)).await, None);
    }

    #[tokio::test]
    async fn transient_denial_is_retried_transparently() {
        let fs = MockFileSystem::new();
        fs.add_file("/t/a", "old");
        let r = resolver(&fs, tracked(&fs, "a"));
        fs.add_file("/t/a", "new");
        fs.fail_reads("/t/a", 1);

        let d = r.resolve(&pending("a", EventKind::Modified)).await.unwrap();
        assert_eq!(d.kind(), ChangeKind::Modified);
        assert!(!d.unreadable);
        assert!(d.retried);
    }

    #[tokio::test]
    async fn persistent_denial_reports_unreadable_modification() {
        let fs = MockFileSystem::new();
        fs.add_file("/t/a", "old");
        let r = resolver(&fs, tracked(&fs, "a"));
        fs.set_unreadable("/t/a");

        let d = r.resolve(&pending("a", EventKind::Modified)).await.unwrap();
        assert_eq!(d.kind(), ChangeKind::Modified);
        assert!(d.unreadable && d.retried);
        assert!(d.entry.record().unwrap().is_unreadable());
    }

    #[tokio::test]
    async fn missing_tracked_file_is_deleted_without_retry() {
        let fs = MockFileSystem::new();
        fs.add_file("/t/a", "old");
        let r = resolver(&fs, tracked(&fs, "a"));
        fs.remove("/t/a");

        let d = r.resolve(&pending("a", EventKind::Deleted)).await.unwrap();
        assert_eq!(d.kind(), ChangeKind::Deleted);
        assert!(!d.retried);
    }

    /// Removes the file at the moment its existence is checked, i.e. after
    /// the retry has already failed to read it.
    #[derive(Debug)]
    struct VanishOnExistsCheck(MockFileSystem);

    impl FileSystem for VanishOnExistsCheck {
        fn open_read(&self, path: &Path) -> io::Result<Box<dyn std::io::Read + Send>> {
            self.0.open_read(path)
        }
        fn metadata(&self, path: &Path) -> io::Result<FileMeta> {
            self.0.metadata(path)
        }
        fn entry_kind(&self, path: &Path) -> io::Result<EntryKind> {
            self.0.entry_kind(path)
        }
        fn exists(&self, path: &Path) -> bool {
            self.0.remove(path);
            self.0.exists(path)
        }
        fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
            self.0.canonicalize(path)
        }
        fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
            self.0.read_dir(path)
        }
    }

    #[tokio::test]
    async fn file_vanishing_while_unreadable_is_deleted() {
        let fs = MockFileSystem::new();
        fs.add_file("/t/a", "old");
        let baseline = Snapshot::new("/t", HashAlgorithm::Sha256, tracked(&fs, "a"));
        fs.set_unreadable("/t/a");
        let r = Resolver::new(
            Arc::new(VanishOnExistsCheck(fs.clone())),
            Arc::new(baseline),
            HashAlgorithm::Sha256,
            Duration::from_millis(5),
        );

        let d = r.resolve(&pending("a", EventKind::Modified)).await.unwrap();
        assert_eq!(d.kind(), ChangeKind::Deleted);
        assert!(d.retried);
        assert!(!d.unreadable);
    }

    #[tokio::test]
    async fn file_removed_during_retry_delay_is_deleted() {
        let fs = MockFileSystem::new();
        fs.add_file("/t/a", "old");
        let baseline = Snapshot::new("/t", HashAlgorithm::Sha256, tracked(&fs, "a"));
        fs.fail_reads("/t/a", u32::MAX);
        let r = Resolver::new(
            Arc::new(fs.clone()),
            Arc::new(baseline),
            HashAlgorithm::Sha256,
            Duration::from_millis(200),
        );

        let remover = fs.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            remover.remove("/t/a");
        });

        let d = r.resolve(&pending("a", EventKind::Modified)).await.unwrap();
        assert_eq!(d.kind(), ChangeKind::Deleted);
        assert!(d.retried);
        assert!(!d.unreadable);
    }

    #[tokio::test]
    async fn directories_are_ignored() {
        let fs = MockFileSystem::new();
        fs.add_dir("/t/sub");
        let r = resolver(&fs, BTreeMap::new());
        assert_eq!(r.resolve(&pending("sub", EventKind::Created)).await, None);
    }
}
