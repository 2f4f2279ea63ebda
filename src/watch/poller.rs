// src/watch/poller.rs

//! Polling fallback for trees where native notifications are unavailable.
//!
//! Each tick rescans the exclusion-filtered tree, diffs it against the
//! previous tick and turns the differences into [`RawEvent`]s for the engine.
//! The poller never compares against the baseline itself; the engine does.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::baseline::{ChangeEntry, FileRecord, ScanOptions, compare_files, scan};
use crate::errors::{FimError, Result};
use crate::exclude::ExclusionMatcher;
use crate::fs::FileSystem;
use crate::watch::engine::WatchInput;
use crate::watch::event::RawEvent;

/// What the previous poll saw.
#[derive(Debug, Clone, Default)]
pub struct PollState {
    pub files: BTreeMap<String, FileRecord>,
    pub locations: BTreeMap<String, PathBuf>,
}

pub struct Poller {
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
    matcher: Arc<ExclusionMatcher>,
    options: ScanOptions,
    interval: Duration,
}

impl fmt::Debug for Poller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Poller")
            .field("root", &self.root)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

impl Poller {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        root: impl Into<PathBuf>,
        matcher: Arc<ExclusionMatcher>,
        options: ScanOptions,
        interval: Duration,
    ) -> Self {
        Self {
            fs,
            root: root.into(),
            matcher,
            options,
            interval,
        }
    }

    /// Scan the tree without producing events.
    pub fn snapshot(&self) -> Result<PollState> {
        let outcome = scan(self.fs.as_ref(), &self.root, &self.matcher, &self.options)?;
        Ok(PollState {
            files: outcome.snapshot.files,
            locations: outcome.locations,
        })
    }

    /// Scan once and report what changed since `previous`.
    pub fn poll_once(&self, previous: &PollState) -> Result<(PollState, Vec<RawEvent>)> {
        let current = self.snapshot()?;
        let events = compare_files(&previous.files, &current.files)
            .into_iter()
            .map(|change| match change {
                ChangeEntry::Created { path, .. } => {
                    RawEvent::Created(self.location(&current, &path))
                }
                ChangeEntry::Modified { path, .. } => {
                    RawEvent::Modified(self.location(&current, &path))
                }
                ChangeEntry::Deleted { path } => RawEvent::Deleted(self.location(previous, &path)),
            })
            .collect();
        Ok((current, events))
    }

    fn location(&self, state: &PollState, key: &str) -> PathBuf {
        state
            .locations
            .get(key)
            .cloned()
            .unwrap_or_else(|| self.root.join(key))
    }

    /// Take the initial snapshot, then poll every `interval` in the
    /// background, forwarding events to `tx` until it closes.
    pub async fn start(self, tx: mpsc::Sender<WatchInput>) -> Result<JoinHandle<()>> {
        let poller = Arc::new(self);

        let initial = {
            let poller = Arc::clone(&poller);
            tokio::task::spawn_blocking(move || poller.snapshot())
                .await
                .map_err(|e| FimError::Other(e.into()))??
        };
        info!(
            root = %poller.root.display(),
            interval_ms = poller.interval.as_millis() as u64,
            files = initial.files.len(),
            "polling started"
        );

        Ok(tokio::spawn(poll_loop(poller, initial, tx)))
    }
}

async fn poll_loop(poller: Arc<Poller>, mut state: PollState, tx: mpsc::Sender<WatchInput>) {
    let mut ticker = tokio::time::interval(poller.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        ticker.tick().await;

        let worker = Arc::clone(&poller);
        let previous = state.clone();
        let result = tokio::task::spawn_blocking(move || worker.poll_once(&previous)).await;

        let events = match result {
            Ok(Ok((current, events))) => {
                state = current;
                events
            }
            Ok(Err(e)) => {
                warn!(error = %e, "poll failed; keeping previous state");
                continue;
            }
            Err(e) => {
                warn!(error = %e, "poll task failed");
                continue;
            }
        };

        if !events.is_empty() {
            debug!(count = events.len(), "poll detected changes");
        }
        for event in events {
            if tx.send(WatchInput::Raw(event)).await.is_err() {
                debug!("engine gone; poller stopping");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn poller(fs: &MockFileSystem, patterns: &[&str]) -> Poller {
        Poller::new(
            Arc::new(fs.clone()),
            "/t",
            Arc::new(ExclusionMatcher::new(patterns).unwrap()),
            ScanOptions {
                case_insensitive: false,
                workers: 1,
                ..ScanOptions::default()
            },
            Duration::from_millis(20),
        )
    }

    #[test]
    fn poll_reports_differences_as_raw_events() {
        let fs = MockFileSystem::new();
        fs.add_file("/t/keep.txt", "k");
        fs.add_file("/t/gone.txt", "g");
        fs.add_file("/t/edit.txt", "v1");

        let p = poller(&fs, &["*.tmp"]);
        let first = p.snapshot().unwrap();

        fs.remove("/t/gone.txt");
        fs.add_file("/t/edit.txt", "v2");
        fs.add_file("/t/new.txt", "n");
        fs.add_file("/t/scratch.tmp", "x");

        let (_, events) = p.poll_once(&first).unwrap();
        assert_eq!(
            events,
            vec![
                RawEvent::Modified("/t/edit.txt".into()),
                RawEvent::Deleted("/t/gone.txt".into()),
                RawEvent::Created("/t/new.txt".into()),
            ]
        );
    }

    #[test]
    fn quiet_tree_produces_no_events() {
        let fs = MockFileSystem::new();
        fs.add_file("/t/a.txt", "a");
        let p = poller(&fs, &[]);
        let first = p.snapshot().unwrap();
        let (_, events) = p.poll_once(&first).unwrap();
        assert!(events.is_empty());
    }
}
