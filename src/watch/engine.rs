// src/watch/engine.rs

//! The watch engine: raw events in, [`WatchDecision`]s out.
//!
//! One task owns the [`DebounceRegistry`] and is the only place decisions are
//! emitted from. Timers and resolutions are short-lived tasks that report
//! back over an internal channel, so the registry never needs a lock.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use crate::baseline::scanner::default_case_insensitive;
use crate::baseline::{ChangeEntry, ScanOptions, Snapshot, collect_files_under, compare, scan};
use crate::errors::{FimError, Result};
use crate::exclude::ExclusionMatcher;
use crate::fs::{EntryKind, FileSystem};
use crate::paths::relative_key;
use crate::types::HashAlgorithm;
use crate::watch::debounce::{DebounceRegistry, PendingResolve};
use crate::watch::decision::{ShutdownReport, WatchDecision};
use crate::watch::event::{EventKind, NormalizedEvent, RawEvent, normalize};
use crate::watch::resolve::Resolver;

/// Messages accepted by a running engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchInput {
    Raw(RawEvent),
    /// The event source lost events (e.g. a kernel queue overflow); the
    /// whole tree has to be checked again.
    Rescan,
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    /// Quiet period after the last event for a path before it is resolved.
    pub debounce: Duration,
    /// Wait before the single re-read of an unreadable file.
    pub retry_delay: Duration,
    pub algorithm: HashAlgorithm,
    pub case_insensitive: bool,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(600),
            retry_delay: Duration::from_millis(500),
            algorithm: HashAlgorithm::default(),
            case_insensitive: default_case_insensitive(),
        }
    }
}

#[derive(Debug)]
enum Internal {
    Fired { key: String, generation: u64 },
    Resolved { key: String, decision: Option<WatchDecision> },
}

/// A path to debounce, after relativizing and directory expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Target {
    key: String,
    kind: EventKind,
    abs_path: PathBuf,
}

#[derive(Clone)]
pub struct WatchEngine {
    root: PathBuf,
    baseline: Arc<Snapshot>,
    matcher: Arc<ExclusionMatcher>,
    fs: Arc<dyn FileSystem>,
    options: WatchOptions,
}

impl fmt::Debug for WatchEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchEngine")
            .field("root", &self.root)
            .field("tracked", &self.baseline.len())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl WatchEngine {
    pub fn new(
        root: impl Into<PathBuf>,
        baseline: Arc<Snapshot>,
        matcher: Arc<ExclusionMatcher>,
        fs: Arc<dyn FileSystem>,
        options: WatchOptions,
    ) -> Self {
        Self {
            root: root.into(),
            baseline,
            matcher,
            fs,
            options,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Main event loop.
    ///
    /// Runs until [`WatchInput::Shutdown`] arrives, the input channel
    /// closes, or the decision receiver is dropped. Pending work is never
    /// half-emitted: every key still debouncing or resolving, plus every key
    /// named by an already-queued input, ends up in the returned report.
    pub async fn run(
        self,
        mut input_rx: mpsc::Receiver<WatchInput>,
        decision_tx: mpsc::Sender<WatchDecision>,
    ) -> Result<ShutdownReport> {
        info!(
            root = %self.root.display(),
            tracked = self.baseline.len(),
            debounce_ms = self.options.debounce.as_millis() as u64,
            retry_ms = self.options.retry_delay.as_millis() as u64,
            "watch engine started"
        );

        let (internal_tx, mut internal_rx) = mpsc::unbounded_channel::<Internal>();
        let mut state = EngineLoop::new(self, internal_tx);

        loop {
            tokio::select! {
                input = input_rx.recv() => match input {
                    Some(WatchInput::Raw(event)) => state.on_raw(event).await,
                    Some(WatchInput::Rescan) => state.on_rescan().await,
                    Some(WatchInput::Shutdown) => {
                        info!("shutdown requested");
                        break;
                    }
                    None => {
                        info!("event source closed; stopping");
                        break;
                    }
                },
                Some(message) = internal_rx.recv() => {
                    if !state.on_internal(message, &decision_tx).await {
                        warn!("decision receiver dropped; stopping");
                        break;
                    }
                }
            }
        }

        let report = state.shutdown(&mut input_rx);
        info!(deferred = report.deferred.len(), "watch engine stopped");
        Ok(report)
    }

    /// Relative key for a path if it is under the root and monitored.
    fn monitored_key(&self, path: &Path) -> Option<String> {
        let key = relative_key(
            self.fs.as_ref(),
            &self.root,
            path,
            self.options.case_insensitive,
        )?;
        (!self.matcher.is_excluded(&key)).then_some(key)
    }

    /// Map one normalized event onto the keys it affects.
    ///
    /// Touches the filesystem; call it off the async runtime.
    ///
    /// - A path that is gone (deleted, or reported modified by a rename of
    ///   unknown direction) and is not itself tracked but has tracked keys
    ///   below it was a directory: each of those keys is deleted.
    /// - A created directory contributes every monitored file inside it.
    /// - A modified directory contributes only files the baseline does not
    ///   know, which is how a directory renamed into place shows up.
    fn targets(&self, event: NormalizedEvent) -> Vec<Target> {
        let ci = self.options.case_insensitive;
        let Some(key) = relative_key(self.fs.as_ref(), &self.root, &event.path, ci) else {
            debug!(path = %event.path.display(), "event outside watch root; ignored");
            return Vec::new();
        };

        let on_disk = match event.kind {
            EventKind::Deleted => None,
            EventKind::Created | EventKind::Modified => Some(self.fs.entry_kind(&event.path)),
        };
        let is_dir = matches!(on_disk, Some(Ok(EntryKind::Dir)));
        let mut out = match &on_disk {
            None => self.removed(&key, &event.path),
            Some(Err(e)) if e.kind() == io::ErrorKind::NotFound => self.removed(&key, &event.path),
            Some(Ok(EntryKind::Dir)) => self.added(&key, &event.path, event.kind),
            Some(_) => Vec::new(),
        };
        if out.is_empty() && !is_dir {
            out.push(Target {
                key,
                kind: event.kind,
                abs_path: event.path,
            });
        }

        out.retain(|t| {
            let excluded = self.matcher.is_excluded(&t.key);
            if excluded {
                debug!(key = %t.key, "excluded; ignored");
            }
            !excluded
        });
        out
    }

    /// Tracked keys below a vanished, untracked directory.
    fn removed(&self, key: &str, path: &Path) -> Vec<Target> {
        if self.baseline.get(key).is_some() {
            return Vec::new();
        }
        let out: Vec<Target> = self
            .baseline
            .keys_under(key)
            .map(|child| Target {
                key: child.clone(),
                kind: EventKind::Deleted,
                abs_path: path.join(&child[key.len() + 1..]),
            })
            .collect();
        if !out.is_empty() {
            debug!(dir = %key, files = out.len(), "expanded directory removal");
        }
        out
    }

    /// Files inside a directory that was created or renamed into place.
    fn added(&self, key: &str, path: &Path, kind: EventKind) -> Vec<Target> {
        if self.matcher.is_dir_excluded(key) && !self.matcher.has_negations() {
            debug!(dir = %key, "excluded directory; ignored");
            return Vec::new();
        }
        let walk = match collect_files_under(
            self.fs.as_ref(),
            path,
            key,
            &self.matcher,
            self.options.case_insensitive,
        ) {
            Ok(walk) => walk,
            Err(e) => {
                warn!(dir = %key, error = %e, "cannot list directory");
                return Vec::new();
            }
        };

        let out: Vec<Target> = walk
            .candidates
            .into_iter()
            .filter(|c| kind == EventKind::Created || self.baseline.get(&c.key).is_none())
            .map(|c| Target {
                key: c.key,
                kind: EventKind::Created,
                abs_path: c.abs_path,
            })
            .collect();
        if !out.is_empty() {
            debug!(dir = %key, files = out.len(), "expanded directory");
        }
        out
    }

    /// Full filtered scan compared with the baseline. Every difference
    /// becomes a target; the resolver confirms each one as usual.
    fn rescan_targets(&self) -> Result<Vec<Target>> {
        let options = ScanOptions {
            algorithm: self.options.algorithm,
            case_insensitive: self.options.case_insensitive,
            ..ScanOptions::default()
        };
        let outcome = scan(self.fs.as_ref(), &self.root, &self.matcher, &options)?;
        let locate = |key: &str| {
            outcome
                .locations
                .get(key)
                .cloned()
                .unwrap_or_else(|| self.root.join(key))
        };

        Ok(compare(&self.baseline, &outcome.snapshot)
            .into_iter()
            .map(|change| {
                let kind = match &change {
                    ChangeEntry::Created { .. } => EventKind::Created,
                    ChangeEntry::Modified { .. } => EventKind::Modified,
                    // Still there but unreadable: let the resolver retry it.
                    ChangeEntry::Deleted { path } if outcome.was_skipped(path) => EventKind::Modified,
                    ChangeEntry::Deleted { .. } => EventKind::Deleted,
                };
                Target {
                    key: change.path().to_string(),
                    kind,
                    abs_path: locate(change.path()),
                }
            })
            .collect())
    }
}

/// State owned by the running engine task.
struct EngineLoop {
    engine: WatchEngine,
    resolver: Resolver,
    registry: DebounceRegistry,
    in_flight: HashMap<String, AbortHandle>,
    internal_tx: mpsc::UnboundedSender<Internal>,
}

impl EngineLoop {
    fn new(engine: WatchEngine, internal_tx: mpsc::UnboundedSender<Internal>) -> Self {
        let resolver = Resolver::new(
            Arc::clone(&engine.fs),
            Arc::clone(&engine.baseline),
            engine.options.algorithm,
            engine.options.retry_delay,
        );
        Self {
            engine,
            resolver,
            registry: DebounceRegistry::new(),
            in_flight: HashMap::new(),
            internal_tx,
        }
    }

    async fn on_raw(&mut self, event: RawEvent) {
        debug!(?event, "raw event");
        let engine = self.engine.clone();
        let expanded = tokio::task::spawn_blocking(move || {
            normalize(event)
                .into_iter()
                .flat_map(|normalized| engine.targets(normalized))
                .collect::<Vec<_>>()
        })
        .await;

        match expanded {
            Ok(targets) => targets.into_iter().for_each(|t| self.arm(t)),
            Err(e) => warn!(error = %e, "event expansion failed"),
        }
    }

    async fn on_rescan(&mut self) {
        warn!("event source lost events; rescanning the tree");
        let engine = self.engine.clone();
        let result = tokio::task::spawn_blocking(move || engine.rescan_targets())
            .await
            .map_err(|e| FimError::Other(e.into()))
            .and_then(|r| r);

        match result {
            Ok(targets) => {
                info!(changes = targets.len(), "rescan complete");
                targets.into_iter().for_each(|t| self.arm(t));
            }
            Err(e) => warn!(error = %e, "rescan failed; changes will surface at the next start"),
        }
    }

    fn arm(&mut self, target: Target) {
        let tx = self.internal_tx.clone();
        let delay = self.engine.options.debounce;
        let timer_key = target.key.clone();

        self.registry
            .arm(target.key, target.kind, target.abs_path, move |generation| {
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = tx.send(Internal::Fired {
                        key: timer_key,
                        generation,
                    });
                })
                .abort_handle()
            });
    }

    /// Returns `false` once decisions can no longer be delivered.
    async fn on_internal(
        &mut self,
        message: Internal,
        decision_tx: &mpsc::Sender<WatchDecision>,
    ) -> bool {
        match message {
            Internal::Fired { key, generation } => {
                if let Some(pending) = self.registry.fire(&key, generation) {
                    self.start_resolve(pending);
                }
            }
            Internal::Resolved { key, decision } => {
                self.in_flight.remove(&key);

                if let Some(decision) = decision {
                    debug!(
                        key = %decision.path(),
                        kind = %decision.kind(),
                        unreadable = decision.unreadable,
                        retried = decision.retried,
                        "decision"
                    );
                    if decision_tx.send(decision).await.is_err() {
                        return false;
                    }
                } else {
                    debug!(key = %key, "no change");
                }

                if let Some(pending) = self.registry.finish(&key) {
                    self.start_resolve(pending);
                }
            }
        }
        true
    }

    fn start_resolve(&mut self, pending: PendingResolve) {
        let resolver = self.resolver.clone();
        let tx = self.internal_tx.clone();
        let key = pending.key.clone();

        let handle = tokio::spawn(async move {
            let decision = resolver.resolve(&pending).await;
            let _ = tx.send(Internal::Resolved {
                key: pending.key,
                decision,
            });
        });
        self.in_flight.insert(key, handle.abort_handle());
    }

    fn shutdown(mut self, input_rx: &mut mpsc::Receiver<WatchInput>) -> ShutdownReport {
        for (_, handle) in self.in_flight.drain() {
            handle.abort();
        }
        let mut deferred = self.registry.shutdown();

        input_rx.close();
        while let Ok(input) = input_rx.try_recv() {
            match input {
                WatchInput::Raw(event) => deferred.extend(
                    normalize(event)
                        .iter()
                        .filter_map(|n| self.engine.monitored_key(&n.path)),
                ),
                WatchInput::Rescan => info!("pending rescan left to the next start-up reconciliation"),
                WatchInput::Shutdown => {}
            }
        }

        deferred.sort();
        deferred.dedup();
        ShutdownReport { deferred }
    }
}
