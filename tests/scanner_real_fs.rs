use std::fs;

use anyhow::Result;

use fimwatch::baseline::{ScanOptions, scan};
use fimwatch::exclude::ExclusionMatcher;
use fimwatch::fs::RealFileSystem;
use fimwatch::types::HashAlgorithm;
use fimwatch_test_utils::builders::digest;
use fimwatch_test_utils::init_tracing;

fn opts() -> ScanOptions {
    ScanOptions {
        algorithm: HashAlgorithm::Sha256,
        case_insensitive: false,
        workers: 2,
    }
}

#[test]
fn keys_are_relative_and_slash_separated() -> Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    fs::create_dir_all(dir.path().join("a/b"))?;
    fs::write(dir.path().join("top.txt"), "top")?;
    fs::write(dir.path().join("a/b/deep.txt"), "deep")?;

    let outcome = scan(&RealFileSystem, dir.path(), &ExclusionMatcher::empty(), &opts())?;
    let keys: Vec<&str> = outcome.snapshot.files.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["a/b/deep.txt", "top.txt"]);

    let deep = outcome.snapshot.get("a/b/deep.txt").expect("tracked");
    assert_eq!(deep.hash, digest(b"deep", HashAlgorithm::Sha256));
    assert_eq!(deep.size, 4);
    Ok(())
}

#[test]
fn excluded_directories_and_reincluded_files() -> Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    fs::create_dir_all(dir.path().join("node_modules/pkg"))?;
    fs::create_dir_all(dir.path().join("logs"))?;
    fs::write(dir.path().join("node_modules/pkg/index.js"), "x")?;
    fs::write(dir.path().join("logs/app.log"), "x")?;
    fs::write(dir.path().join("logs/keep.log"), "x")?;
    fs::write(dir.path().join("main.rs"), "x")?;

    let matcher = ExclusionMatcher::new(&["node_modules", "*.log", "!keep.log"])?;
    let outcome = scan(&RealFileSystem, dir.path(), &matcher, &opts())?;
    let keys: Vec<&str> = outcome.snapshot.files.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["logs/keep.log", "main.rs"]);
    Ok(())
}

#[test]
fn blake3_snapshots_record_the_algorithm() -> Result<()> {
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("f"), "content")?;

    let options = ScanOptions {
        algorithm: HashAlgorithm::Blake3,
        ..opts()
    };
    let outcome = scan(&RealFileSystem, dir.path(), &ExclusionMatcher::empty(), &options)?;
    assert_eq!(outcome.snapshot.hash_algorithm, HashAlgorithm::Blake3);
    assert_eq!(
        outcome.snapshot.get("f").map(|r| r.hash.clone()),
        Some(digest(b"content", HashAlgorithm::Blake3))
    );
    Ok(())
}

#[cfg(unix)]
#[test]
fn file_links_are_hashed_and_directory_links_not_followed() -> Result<()> {
    use std::os::unix::fs::symlink;

    init_tracing();
    let outside = tempfile::tempdir()?;
    fs::write(outside.path().join("secret.txt"), "outside")?;

    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("real.txt"), "real")?;
    symlink(dir.path().join("real.txt"), dir.path().join("link.txt"))?;
    symlink(outside.path(), dir.path().join("linked_dir"))?;
    symlink(dir.path().join("missing"), dir.path().join("dangling"))?;

    let outcome = scan(&RealFileSystem, dir.path(), &ExclusionMatcher::empty(), &opts())?;
    let keys: Vec<&str> = outcome.snapshot.files.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["link.txt", "real.txt"]);
    assert_eq!(
        outcome.snapshot.get("link.txt").map(|r| r.hash.clone()),
        Some(digest(b"real", HashAlgorithm::Sha256))
    );
    assert!(outcome.skipped.is_empty());
    Ok(())
}

#[test]
fn empty_directory_gives_empty_snapshot() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let outcome = scan(&RealFileSystem, dir.path(), &ExclusionMatcher::empty(), &opts())?;
    assert!(outcome.snapshot.is_empty());
    assert!(outcome.skipped.is_empty());
    Ok(())
}
