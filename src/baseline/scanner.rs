// src/baseline/scanner.rs

//! Full-tree scan into a [`Snapshot`].
//!
//! The walk itself is sequential. Fingerprinting, the expensive part, runs on
//! a bounded rayon pool, and results are merged into the ordered map on the
//! calling thread once every worker is done.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::baseline::fingerprint::{Fingerprint, fingerprint};
use crate::baseline::record::Snapshot;
use crate::errors::{FimError, Result};
use crate::exclude::ExclusionMatcher;
use crate::fs::{EntryKind, FileSystem};
use crate::paths::normalize_key;
use crate::types::HashAlgorithm;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    pub algorithm: HashAlgorithm,
    /// Fold keys to lowercase.
    pub case_insensitive: bool,
    /// Size of the fingerprinting pool.
    pub workers: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            algorithm: HashAlgorithm::default(),
            case_insensitive: default_case_insensitive(),
            workers: 4,
        }
    }
}

/// Platform default for key case folding.
pub fn default_case_insensitive() -> bool {
    cfg!(any(target_os = "windows", target_os = "macos"))
}

/// A file selected for fingerprinting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub key: String,
    pub abs_path: PathBuf,
}

/// Result of a directory walk, before hashing.
#[derive(Debug, Default)]
pub struct WalkResult {
    /// Sorted by key, unique.
    pub candidates: Vec<Candidate>,
    /// Directories (`"dir/"`) and entries that could not be inspected.
    pub skipped: Vec<String>,
}

#[derive(Debug)]
pub struct ScanOutcome {
    pub snapshot: Snapshot,
    /// Keys that were found but could not be read, sorted. Unreadable
    /// directories appear with a trailing `/`.
    pub skipped: Vec<String>,
    /// Absolute path for every candidate key, readable or not.
    pub locations: BTreeMap<String, PathBuf>,
}

impl ScanOutcome {
    /// Whether `key` was skipped, either itself or through an unreadable
    /// ancestor directory.
    pub fn was_skipped(&self, key: &str) -> bool {
        self.skipped.iter().any(|s| match s.strip_suffix('/') {
            Some(dir) => key.starts_with(s.as_str()) || key == dir,
            None => key == s,
        })
    }
}

/// Check that `root` is a directory and return its canonical form.
pub fn resolve_root(fs: &dyn FileSystem, root: &Path) -> Result<PathBuf> {
    let invalid = |reason: String| FimError::InvalidTarget {
        path: root.to_path_buf(),
        reason,
    };

    let canon = fs.canonicalize(root).map_err(|e| invalid(e.to_string()))?;
    match fs.entry_kind(&canon) {
        Ok(EntryKind::Dir) | Ok(EntryKind::DirLink) => Ok(canon),
        Ok(_) => Err(invalid("not a directory".to_string())),
        Err(e) => Err(invalid(e.to_string())),
    }
}

/// Walk `root` and return the monitored files, without hashing them.
///
/// - Directory links are not descended.
/// - File links are kept; the link target's content is what gets hashed.
/// - Sockets, devices and dangling links are ignored.
/// - Excluded directories are pruned when no `!` pattern could re-include
///   something below them.
pub fn collect_files(
    fs: &dyn FileSystem,
    root: &Path,
    matcher: &ExclusionMatcher,
    case_insensitive: bool,
) -> Result<WalkResult> {
    walk(fs, root, None, matcher, case_insensitive)
}

/// Like [`collect_files`] for a subdirectory of the watch root. `prefix` is
/// the directory's own key; every returned key starts with it, and the
/// matcher sees the full keys.
pub fn collect_files_under(
    fs: &dyn FileSystem,
    dir: &Path,
    prefix: &str,
    matcher: &ExclusionMatcher,
    case_insensitive: bool,
) -> Result<WalkResult> {
    walk(fs, dir, Some(prefix), matcher, case_insensitive)
}

fn walk(
    fs: &dyn FileSystem,
    root: &Path,
    prefix: Option<&str>,
    matcher: &ExclusionMatcher,
    case_insensitive: bool,
) -> Result<WalkResult> {
    let key_of = |path: &Path| {
        let key = key_for(root, path, case_insensitive)?;
        Some(match prefix {
            Some(prefix) => format!("{prefix}/{key}"),
            None => key,
        })
    };
    let prune = !matcher.has_negations();
    let mut result = WalkResult::default();
    let mut seen: BTreeMap<String, PathBuf> = BTreeMap::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let mut entries = match fs.read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if dir == root => return Err(e.into()),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "cannot list directory; skipping");
                if let Some(key) = key_of(&dir) {
                    result.skipped.push(format!("{key}/"));
                }
                continue;
            }
        };
        entries.sort();
        let mut subdirs = Vec::new();

        for path in entries {
            let Some(key) = key_of(&path) else {
                continue;
            };

            let kind = match fs.entry_kind(&path) {
                Ok(kind) => kind,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "cannot inspect entry; skipping");
                    result.skipped.push(key);
                    continue;
                }
            };

            match kind {
                EntryKind::Dir => {
                    if prune && matcher.is_dir_excluded(&key) {
                        debug!(dir = %key, "pruned excluded directory");
                    } else {
                        subdirs.push(path);
                    }
                }
                EntryKind::File | EntryKind::FileLink => {
                    if matcher.is_excluded(&key) {
                        continue;
                    }
                    if let Some(first) = seen.get(&key) {
                        warn!(
                            key = %key,
                            kept = %first.display(),
                            dropped = %path.display(),
                            "paths collide after case folding; keeping the first"
                        );
                        continue;
                    }
                    seen.insert(key, path);
                }
                EntryKind::DirLink => debug!(path = %path.display(), "not following directory link"),
                EntryKind::Other => debug!(path = %path.display(), "ignoring special file"),
            }
        }

        // Reversed so the stack pops subdirectories in name order.
        stack.extend(subdirs.into_iter().rev());
    }

    result.candidates = seen
        .into_iter()
        .map(|(key, abs_path)| Candidate { key, abs_path })
        .collect();
    result.skipped.sort();
    Ok(result)
}

/// Walk, filter and fingerprint `root` into a fresh snapshot.
pub fn scan(
    fs: &dyn FileSystem,
    root: &Path,
    matcher: &ExclusionMatcher,
    options: &ScanOptions,
) -> Result<ScanOutcome> {
    let root = resolve_root(fs, root)?;
    let walk = collect_files(fs, &root, matcher, options.case_insensitive)?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.workers.max(1))
        .thread_name(|i| format!("fimwatch-scan-{i}"))
        .build()
        .map_err(|e| FimError::Other(anyhow::anyhow!("failed to start scan workers: {e}")))?;

    let algorithm = options.algorithm;
    let fingerprints: Vec<(Candidate, Fingerprint)> = pool.install(|| {
        walk.candidates
            .into_par_iter()
            .map(|c| {
                let fp = fingerprint(fs, &c.abs_path, &c.key, algorithm);
                (c, fp)
            })
            .collect()
    });

    let mut files = BTreeMap::new();
    let mut locations = BTreeMap::new();
    let mut skipped = walk.skipped;

    for (candidate, fp) in fingerprints {
        match fp {
            Fingerprint::Ok(record) => {
                files.insert(candidate.key.clone(), record);
                locations.insert(candidate.key, candidate.abs_path);
            }
            Fingerprint::Unreadable(io::ErrorKind::NotFound) => {
                debug!(key = %candidate.key, "file vanished during scan");
            }
            Fingerprint::Unreadable(kind) => {
                warn!(key = %candidate.key, ?kind, "file unreadable; skipping");
                skipped.push(candidate.key.clone());
                locations.insert(candidate.key, candidate.abs_path);
            }
        }
    }
    skipped.sort();

    info!(
        root = %root.display(),
        files = files.len(),
        skipped = skipped.len(),
        "scan complete"
    );

    Ok(ScanOutcome {
        snapshot: Snapshot::new(root.display().to_string(), algorithm, files),
        skipped,
        locations,
    })
}

fn key_for(root: &Path, path: &Path, case_insensitive: bool) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    normalize_key(rel, case_insensitive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn opts() -> ScanOptions {
        ScanOptions {
            case_insensitive: false,
            workers: 2,
            ..ScanOptions::default()
        }
    }

    fn keys(outcome: &ScanOutcome) -> Vec<&str> {
        outcome.snapshot.files.keys().map(String::as_str).collect()
    }

    #[test]
    fn scans_nested_tree_with_relative_keys() {
        let fs = MockFileSystem::new();
        fs.add_file("/t/a.txt", "a");
        fs.add_file("/t/sub/b.txt", "b");
        fs.add_file("/t/sub/deep/c.txt", "c");

        let out = scan(&fs, Path::new("/t"), &ExclusionMatcher::empty(), &opts()).unwrap();
        assert_eq!(keys(&out), vec!["a.txt", "sub/b.txt", "sub/deep/c.txt"]);
        assert!(out.skipped.is_empty());
        assert_eq!(out.snapshot.target_root, "/t");
    }

    #[test]
    fn unreadable_files_are_skipped_not_recorded() {
        let fs = MockFileSystem::new();
        fs.add_file("/t/a.txt", "a");
        fs.add_file("/t/secret.txt", "s");
        fs.set_unreadable("/t/secret.txt");

        let out = scan(&fs, Path::new("/t"), &ExclusionMatcher::empty(), &opts()).unwrap();
        assert_eq!(keys(&out), vec!["a.txt"]);
        assert_eq!(out.skipped, vec!["secret.txt".to_string()]);
        assert!(out.was_skipped("secret.txt"));
        assert!(out.locations.contains_key("secret.txt"));
    }

    #[test]
    fn exclusions_apply_with_and_without_negation() {
        let fs = MockFileSystem::new();
        fs.add_file("/t/app.log", "x");
        fs.add_file("/t/keep.log", "x");
        fs.add_file("/t/node_modules/m/index.js", "x");
        fs.add_file("/t/src/main.rs", "x");

        let matcher = ExclusionMatcher::new(&["*.log", "!keep.log", "node_modules"]).unwrap();
        let out = scan(&fs, Path::new("/t"), &matcher, &opts()).unwrap();
        assert_eq!(keys(&out), vec!["keep.log", "src/main.rs"]);

        let pruning = ExclusionMatcher::new(&["node_modules"]).unwrap();
        let out = scan(&fs, Path::new("/t"), &pruning, &opts()).unwrap();
        assert_eq!(keys(&out), vec!["app.log", "keep.log", "src/main.rs"]);
    }

    #[test]
    fn case_folding_collisions_keep_first_path() {
        let fs = MockFileSystem::new();
        fs.add_file("/t/README.md", "upper");
        fs.add_file("/t/readme.md", "lower");

        let options = ScanOptions {
            case_insensitive: true,
            ..opts()
        };
        let out = scan(&fs, Path::new("/t"), &ExclusionMatcher::empty(), &options).unwrap();
        assert_eq!(keys(&out), vec!["readme.md"]);
        assert_eq!(
            out.locations.get("readme.md"),
            Some(&PathBuf::from("/t/README.md"))
        );
    }

    #[test]
    fn missing_root_is_invalid_target() {
        let fs = MockFileSystem::new();
        let err = scan(&fs, Path::new("/nope"), &ExclusionMatcher::empty(), &opts()).unwrap_err();
        assert!(matches!(err, FimError::InvalidTarget { .. }));
    }

    #[test]
    fn file_root_is_invalid_target() {
        let fs = MockFileSystem::new();
        fs.add_file("/t/a.txt", "a");
        let err = scan(&fs, Path::new("/t/a.txt"), &ExclusionMatcher::empty(), &opts()).unwrap_err();
        assert!(matches!(err, FimError::InvalidTarget { .. }));
    }

    #[test]
    fn subdirectory_walk_matches_full_keys() {
        let fs = MockFileSystem::new();
        fs.add_file("/t/build/out/app.bin", "x");
        fs.add_file("/t/build/notes.md", "x");
        fs.add_file("/t/build/node_modules/m/index.js", "x");

        // Anchored patterns only match when the walk sees the full key.
        let matcher = ExclusionMatcher::new(&["/build/out", "node_modules"]).unwrap();
        let walk = collect_files_under(&fs, Path::new("/t/build"), "build", &matcher, false).unwrap();

        let keys: Vec<&str> = walk.candidates.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["build/notes.md"]);
        assert_eq!(walk.candidates[0].abs_path, PathBuf::from("/t/build/notes.md"));
    }

    #[test]
    fn skipped_directory_covers_its_children() {
        let out = ScanOutcome {
            snapshot: Snapshot::new("/t", HashAlgorithm::Sha256, BTreeMap::new()),
            skipped: vec!["private/".into(), "x.txt".into()],
            locations: BTreeMap::new(),
        };
        assert!(out.was_skipped("private/key.pem"));
        assert!(out.was_skipped("x.txt"));
        assert!(!out.was_skipped("privateer.txt"));
    }
}
