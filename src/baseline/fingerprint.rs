// src/baseline/fingerprint.rs

//! Content fingerprinting for a single file.
//!
//! Failures never escape as errors: a file that cannot be opened or read
//! yields [`Fingerprint::Unreadable`] and the caller decides what that means
//! (skip during a scan, retry during a watch).

use std::io::{self, Read};
use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::baseline::record::FileRecord;
use crate::fs::FileSystem;
use crate::types::HashAlgorithm;

const CHUNK_SIZE: usize = 64 * 1024;

/// Outcome of fingerprinting one file.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fingerprint {
    Ok(FileRecord),
    Unreadable(io::ErrorKind),
}

impl Fingerprint {
    pub fn into_record(self) -> Option<FileRecord> {
        match self {
            Fingerprint::Ok(record) => Some(record),
            Fingerprint::Unreadable(_) => None,
        }
    }
}

enum Digester {
    Sha256(Sha256),
    Blake3(Box<blake3::Hasher>),
}

impl Digester {
    fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Sha256 => Digester::Sha256(Sha256::new()),
            HashAlgorithm::Blake3 => Digester::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    fn update(&mut self, bytes: &[u8]) {
        match self {
            Digester::Sha256(h) => h.update(bytes),
            Digester::Blake3(h) => {
                h.update(bytes);
            }
        }
    }

    fn finish(self) -> String {
        match self {
            Digester::Sha256(h) => hex::encode(h.finalize()),
            Digester::Blake3(h) => h.finalize().to_hex().to_string(),
        }
    }
}

/// Stream `reader` through the chosen digest in bounded chunks.
pub fn hash_reader(reader: &mut dyn Read, algorithm: HashAlgorithm) -> io::Result<String> {
    let mut digester = Digester::new(algorithm);
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        digester.update(&buf[..n]);
    }
    Ok(digester.finish())
}

/// Compute the record for `abs_path`, stored under `key`.
///
/// Size and mtime are taken before the content is hashed.
pub fn fingerprint(
    fs: &dyn FileSystem,
    abs_path: &Path,
    key: &str,
    algorithm: HashAlgorithm,
) -> Fingerprint {
    let meta = match fs.metadata(abs_path) {
        Ok(meta) => meta,
        Err(e) => {
            debug!(path = %abs_path.display(), error = %e, "metadata unavailable");
            return Fingerprint::Unreadable(e.kind());
        }
    };

    let hash = fs
        .open_read(abs_path)
        .and_then(|mut reader| hash_reader(&mut reader, algorithm));

    match hash {
        Ok(hash) => Fingerprint::Ok(FileRecord {
            path: key.to_string(),
            hash,
            size: meta.len,
            mtime: meta.mtime,
        }),
        Err(e) => {
            debug!(path = %abs_path.display(), error = %e, "file unreadable");
            Fingerprint::Unreadable(e.kind())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::RealFileSystem;
    use crate::fs::mock::MockFileSystem;

    const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    #[test]
    fn sha256_of_known_content() {
        let fs = MockFileSystem::new();
        fs.add_file("/t/a.txt", "hello");

        let fp = fingerprint(&fs, Path::new("/t/a.txt"), "a.txt", HashAlgorithm::Sha256);
        let record = fp.into_record().unwrap();
        assert_eq!(record.hash, HELLO_SHA256);
        assert_eq!(record.size, 5);
        assert_eq!(record.path, "a.txt");
    }

    #[test]
    fn blake3_matches_reference_implementation() {
        let fs = MockFileSystem::new();
        fs.add_file("/t/a.txt", "hello");

        let fp = fingerprint(&fs, Path::new("/t/a.txt"), "a.txt", HashAlgorithm::Blake3);
        let expected = blake3::hash(b"hello").to_hex().to_string();
        assert_eq!(fp.into_record().unwrap().hash, expected);
    }

    #[test]
    fn large_content_spans_several_chunks() {
        let content = vec![7u8; CHUNK_SIZE * 3 + 11];
        let expected = hex::encode(Sha256::digest(&content));

        let got = hash_reader(&mut content.as_slice(), HashAlgorithm::Sha256).unwrap();
        assert_eq!(got, expected);
    }

    #[test]
    fn permission_denied_is_unreadable_not_an_error() {
        let fs = MockFileSystem::new();
        fs.add_file("/t/a.txt", "hello");
        fs.set_unreadable("/t/a.txt");

        let fp = fingerprint(&fs, Path::new("/t/a.txt"), "a.txt", HashAlgorithm::Sha256);
        assert_eq!(fp, Fingerprint::Unreadable(io::ErrorKind::PermissionDenied));
    }

    #[test]
    fn missing_file_is_unreadable_not_found() {
        let fs = MockFileSystem::new();
        let fp = fingerprint(&fs, Path::new("/t/none"), "none", HashAlgorithm::Sha256);
        assert_eq!(fp, Fingerprint::Unreadable(io::ErrorKind::NotFound));
    }

    #[test]
    fn real_file_is_hashed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "hello").unwrap();

        let fp = fingerprint(&RealFileSystem, &path, "a.txt", HashAlgorithm::Sha256);
        assert_eq!(fp.into_record().unwrap().hash, HELLO_SHA256);
    }
}
