// src/baseline/mod.rs

//! Baseline capture and comparison.
//!
//! - [`fingerprint`] hashes one file and never fails loudly.
//! - [`scanner`] walks a tree into a [`Snapshot`].
//! - [`compare`] diffs snapshots (or single records) by content hash.

pub mod compare;
pub mod fingerprint;
pub mod record;
pub mod scanner;

pub use compare::{ChangeEntry, ChangeKind, ChangeSummary, compare, compare_files, compare_one};
pub use fingerprint::{Fingerprint, fingerprint, hash_reader};
pub use record::{FileRecord, SCHEMA_VERSION, Snapshot, UNREADABLE_HASH};
pub use scanner::{ScanOptions, ScanOutcome, collect_files, collect_files_under, resolve_root, scan};
