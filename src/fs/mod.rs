// src/fs/mod.rs

//! Read-only filesystem abstraction.
//!
//! The fingerprinter, scanner and watch engine only ever *read* from the
//! monitored tree, so the trait has no write operations. Errors are plain
//! `io::Error`s: callers need the `ErrorKind` to tell a vanished file from an
//! unreadable one.

use std::fmt::Debug;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

pub mod mock;

/// Size and modification time of a file (links followed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMeta {
    pub len: u64,
    /// Whole seconds since the Unix epoch.
    pub mtime: i64,
}

/// What a directory entry is, without following directory links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
    /// Symbolic link whose target is a regular file.
    FileLink,
    /// Symbolic link whose target is a directory. Never descended.
    DirLink,
    /// Sockets, devices, dangling links and anything else.
    Other,
}

/// Abstract filesystem interface.
pub trait FileSystem: Send + Sync + Debug {
    fn open_read(&self, path: &Path) -> io::Result<Box<dyn Read + Send>>;

    fn metadata(&self, path: &Path) -> io::Result<FileMeta>;

    /// Classify `path`. Missing paths yield an `ErrorKind::NotFound` error.
    fn entry_kind(&self, path: &Path) -> io::Result<EntryKind>;

    /// True unless the path is definitively gone.
    ///
    /// A permission error while probing counts as "exists": the caller must
    /// not turn an unreadable file into a deletion.
    fn exists(&self, path: &Path) -> bool;

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;

    /// Return a list of entries in a directory.
    /// Returns full paths.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn open_read(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
        let file = fs::File::open(path)?;
        Ok(Box::new(file))
    }

    fn metadata(&self, path: &Path) -> io::Result<FileMeta> {
        let meta = fs::metadata(path)?;
        let mtime = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        Ok(FileMeta {
            len: meta.len(),
            mtime,
        })
    }

    fn entry_kind(&self, path: &Path) -> io::Result<EntryKind> {
        let meta = fs::symlink_metadata(path)?;
        let file_type = meta.file_type();

        if file_type.is_symlink() {
            return Ok(match fs::metadata(path) {
                Ok(target) if target.is_dir() => EntryKind::DirLink,
                Ok(target) if target.is_file() => EntryKind::FileLink,
                _ => EntryKind::Other,
            });
        }

        Ok(if file_type.is_dir() {
            EntryKind::Dir
        } else if file_type.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        })
    }

    fn exists(&self, path: &Path) -> bool {
        match fs::symlink_metadata(path) {
            Ok(_) => true,
            Err(err) => err.kind() != io::ErrorKind::NotFound,
        }
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        fs::canonicalize(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            entries.push(entry.path());
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn real_fs_reports_missing_paths_as_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.txt");

        let fs = RealFileSystem;
        assert!(!fs.exists(&missing));
        let err = fs.entry_kind(&missing).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn real_fs_classifies_files_and_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        std::fs::write(&file, "hello").unwrap();

        let fs = RealFileSystem;
        assert_eq!(fs.entry_kind(dir.path()).unwrap(), EntryKind::Dir);
        assert_eq!(fs.entry_kind(&file).unwrap(), EntryKind::File);
        assert_eq!(fs.metadata(&file).unwrap().len, 5);
    }

    #[cfg(unix)]
    #[test]
    fn real_fs_classifies_symlinks_by_target() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        let sub = dir.path().join("sub");
        std::fs::write(&file, "x").unwrap();
        std::fs::create_dir(&sub).unwrap();

        let file_link = dir.path().join("file_link");
        let dir_link = dir.path().join("dir_link");
        let dangling = dir.path().join("dangling");
        std::os::unix::fs::symlink(&file, &file_link).unwrap();
        std::os::unix::fs::symlink(&sub, &dir_link).unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone"), &dangling).unwrap();

        let fs = RealFileSystem;
        assert_eq!(fs.entry_kind(&file_link).unwrap(), EntryKind::FileLink);
        assert_eq!(fs.entry_kind(&dir_link).unwrap(), EntryKind::DirLink);
        assert_eq!(fs.entry_kind(&dangling).unwrap(), EntryKind::Other);
    }
}
