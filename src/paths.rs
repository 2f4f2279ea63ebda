// src/paths.rs

//! Relative-key normalization shared by the scanner and the watch engine.
//!
//! A key is the path relative to the target root, `/`-separated, with no
//! `.`/`..` components, and lowercased only when the tree is treated as
//! case-insensitive. Both the baseline and every watch decision are keyed
//! this way, so a key built here is the only identity a file has.

use std::path::{Component, Path};

use crate::fs::FileSystem;

/// Turn an already-relative path into a key.
///
/// Returns `None` for empty paths and for paths that climb out of the root
/// (`..`) or are absolute.
pub fn normalize_key(rel: &Path, case_insensitive: bool) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    if parts.is_empty() {
        return None;
    }

    let key = parts.join("/");
    Some(if case_insensitive {
        key.to_lowercase()
    } else {
        key
    })
}

/// Convert `path` into a key relative to `root`.
///
/// - First we try a direct `strip_prefix(root)`.
/// - If that fails (e.g. due to symlinks or different absolute prefixes),
///   we canonicalize both paths and try again.
/// - A path that no longer exists cannot be canonicalized, so for deletions
///   we canonicalize its parent and re-attach the file name.
///
/// Returns `None` if the path cannot be reasonably related to `root`.
pub fn relative_key(
    fs: &dyn FileSystem,
    root: &Path,
    path: &Path,
    case_insensitive: bool,
) -> Option<String> {
    // Fast path: event path already starts with our root.
    if let Ok(rel) = path.strip_prefix(root) {
        return normalize_key(rel, case_insensitive);
    }

    let root_canon = fs.canonicalize(root).ok()?;

    if let Ok(path_canon) = fs.canonicalize(path) {
        if let Ok(rel) = path_canon.strip_prefix(&root_canon) {
            return normalize_key(rel, case_insensitive);
        }
    }

    let parent = path.parent()?;
    let name = path.file_name()?;
    let parent_canon = fs.canonicalize(parent).ok()?;
    let rel = parent_canon.join(name);
    let rel = rel.strip_prefix(&root_canon).ok()?;
    normalize_key(rel, case_insensitive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use std::path::PathBuf;

    #[test]
    fn keys_are_forward_slashed_and_clean() {
        let rel = PathBuf::from("./a").join("b").join("c.txt");
        assert_eq!(normalize_key(&rel, false).as_deref(), Some("a/b/c.txt"));
    }

    #[test]
    fn keys_reject_escapes_and_empties() {
        assert_eq!(normalize_key(Path::new("../x"), false), None);
        assert_eq!(normalize_key(Path::new(""), false), None);
        assert_eq!(normalize_key(Path::new("."), false), None);
    }

    #[test]
    fn case_folding_only_when_requested() {
        assert_eq!(normalize_key(Path::new("Dir/A.TXT"), false).as_deref(), Some("Dir/A.TXT"));
        assert_eq!(normalize_key(Path::new("Dir/A.TXT"), true).as_deref(), Some("dir/a.txt"));
    }

    #[test]
    fn relative_key_strips_root() {
        let fs = MockFileSystem::new();
        let key = relative_key(&fs, Path::new("/watched"), Path::new("/watched/sub/x.rs"), false);
        assert_eq!(key.as_deref(), Some("sub/x.rs"));
        assert_eq!(relative_key(&fs, Path::new("/watched"), Path::new("/elsewhere/x"), false), None);
        assert_eq!(relative_key(&fs, Path::new("/watched"), Path::new("/watched"), false), None);
    }
}
