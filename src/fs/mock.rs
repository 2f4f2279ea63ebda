// src/fs/mock.rs

use super::{EntryKind, FileMeta, FileSystem};
use std::collections::HashMap;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Default mtime for files added without an explicit one.
pub const MOCK_MTIME: i64 = 1_700_000_000;

#[derive(Debug, Clone)]
pub enum MockEntry {
    File {
        content: Vec<u8>,
        mtime: i64,
        /// Number of upcoming `open_read` calls that fail with
        /// `PermissionDenied`. `u32::MAX` means "always".
        failing_reads: u32,
    },
    Dir(Vec<String>), // List of child names
}

/// In-memory filesystem used by tests.
///
/// Clones share the same tree, so a test can keep one handle and mutate
/// files while the watch engine reads through another.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        let mut files = HashMap::new();
        // Ensure root exists
        files.insert(PathBuf::from("."), MockEntry::Dir(Vec::new()));

        Self {
            files: Arc::new(Mutex::new(files)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, MockEntry>> {
        self.files.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        self.add_file_with_mtime(path, content, MOCK_MTIME);
    }

    pub fn add_file_with_mtime(
        &self,
        path: impl AsRef<Path>,
        content: impl Into<Vec<u8>>,
        mtime: i64,
    ) {
        let path = path.as_ref().to_path_buf();
        let mut files = self.lock();
        files.insert(
            path.clone(),
            MockEntry::File {
                content: content.into(),
                mtime,
                failing_reads: 0,
            },
        );
        link_into_parent(&mut files, &path);
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let mut files = self.lock();
        ensure_dir_entry(&mut files, path.as_ref());
    }

    /// Make the next `count` reads of `path` fail with `PermissionDenied`.
    pub fn fail_reads(&self, path: impl AsRef<Path>, count: u32) {
        let mut files = self.lock();
        if let Some(MockEntry::File { failing_reads, .. }) = files.get_mut(path.as_ref()) {
            *failing_reads = count;
        }
    }

    /// Make every read of `path` fail until [`set_readable`](Self::set_readable).
    pub fn set_unreadable(&self, path: impl AsRef<Path>) {
        self.fail_reads(path, u32::MAX);
    }

    pub fn set_readable(&self, path: impl AsRef<Path>) {
        self.fail_reads(path, 0);
    }

    /// Remove a file or a whole directory subtree.
    pub fn remove(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut files = self.lock();
        files.retain(|p, _| !(p == path || p.starts_with(path)));

        if let Some(parent) = parent_of(path) {
            if let Some(MockEntry::Dir(children)) = files.get_mut(parent) {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    children.retain(|c| c != name);
                }
            }
        }
    }

    /// Move a file (or a directory subtree) from `from` to `to`.
    pub fn rename(&self, from: impl AsRef<Path>, to: impl AsRef<Path>) {
        let (from, to) = (from.as_ref(), to.as_ref());
        let moved: Vec<(PathBuf, MockEntry)> = {
            let files = self.lock();
            files
                .iter()
                .filter(|(p, _)| *p == from || p.starts_with(from))
                .filter_map(|(p, e)| {
                    let rest = p.strip_prefix(from).ok()?;
                    let target = if rest.as_os_str().is_empty() {
                        to.to_path_buf()
                    } else {
                        to.join(rest)
                    };
                    Some((target, e.clone()))
                })
                .collect()
        };

        self.remove(from);

        let mut files = self.lock();
        for (path, entry) in moved {
            files.insert(path.clone(), entry);
            link_into_parent(&mut files, &path);
        }
    }
}

fn parent_of(path: &Path) -> Option<&Path> {
    path.parent().map(|parent| {
        if parent.as_os_str().is_empty() {
            Path::new(".")
        } else {
            parent
        }
    })
}

fn link_into_parent(files: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
    if let Some(parent) = parent_of(path) {
        if parent == path {
            return;
        }
        ensure_dir_entry(files, parent);
        if let Some(MockEntry::Dir(children)) = files.get_mut(parent) {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if !children.iter().any(|c| c == name) {
                    children.push(name.to_string());
                }
            }
        }
    }
}

fn ensure_dir_entry(files: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
    if files.contains_key(path) {
        return;
    }
    files.insert(path.to_path_buf(), MockEntry::Dir(Vec::new()));
    link_into_parent(files, path);
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("not found: {:?}", path))
}

impl FileSystem for MockFileSystem {
    fn open_read(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
        let mut files = self.lock();
        match files.get_mut(path) {
            Some(MockEntry::File {
                content,
                failing_reads,
                ..
            }) => {
                if *failing_reads > 0 {
                    if *failing_reads != u32::MAX {
                        *failing_reads -= 1;
                    }
                    return Err(io::Error::new(
                        io::ErrorKind::PermissionDenied,
                        format!("permission denied: {:?}", path),
                    ));
                }
                Ok(Box::new(Cursor::new(content.clone())))
            }
            Some(MockEntry::Dir(_)) => Err(io::Error::other(format!(
                "is a directory: {:?}",
                path
            ))),
            None => Err(not_found(path)),
        }
    }

    fn metadata(&self, path: &Path) -> io::Result<FileMeta> {
        let files = self.lock();
        match files.get(path) {
            Some(MockEntry::File { content, mtime, .. }) => Ok(FileMeta {
                len: content.len() as u64,
                mtime: *mtime,
            }),
            Some(MockEntry::Dir(_)) => Ok(FileMeta { len: 0, mtime: 0 }),
            None => Err(not_found(path)),
        }
    }

    fn entry_kind(&self, path: &Path) -> io::Result<EntryKind> {
        let files = self.lock();
        match files.get(path) {
            Some(MockEntry::File { .. }) => Ok(EntryKind::File),
            Some(MockEntry::Dir(_)) => Ok(EntryKind::Dir),
            None => Err(not_found(path)),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        self.lock().contains_key(path)
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        // In mock, we just return the path as is, assuming absolute paths are used in tests
        Ok(path.to_path_buf())
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let files = self.lock();
        match files.get(path) {
            Some(MockEntry::Dir(children)) => {
                Ok(children.iter().map(|name| path.join(name)).collect())
            }
            _ => Err(not_found(path)),
        }
    }
}
