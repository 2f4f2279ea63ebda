// src/watch/watcher.rs

use std::fmt;
use std::path::Path;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::types::WatchMode;
use crate::watch::engine::WatchInput;
use crate::watch::event::from_notify;
use crate::watch::poller::Poller;

enum Source {
    // Held only so the watcher keeps running.
    #[allow(dead_code)]
    Native(RecommendedWatcher),
    Polling(JoinHandle<()>),
}

/// Handle for the running event source.
///
/// Keeps the native watcher alive, or owns the polling task. Dropping the
/// handle stops event delivery.
pub struct WatcherHandle {
    source: Source,
}

impl WatcherHandle {
    /// `"native"` or `"polling"`.
    pub fn mode(&self) -> &'static str {
        match self.source {
            Source::Native(_) => "native",
            Source::Polling(_) => "polling",
        }
    }
}

impl fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatcherHandle")
            .field("mode", &self.mode())
            .finish()
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        if let Source::Polling(task) = &self.source {
            task.abort();
        }
    }
}

/// Start delivering raw events for `root` into `tx`.
///
/// - `Native`: recursive OS notifications; failing to start is an error.
/// - `Polling`: `poller` only.
/// - `Auto`: native first, falling back to `poller` if the platform watcher
///   cannot be started.
pub async fn spawn_event_source(
    root: &Path,
    mode: WatchMode,
    poller: Poller,
    tx: mpsc::Sender<WatchInput>,
) -> Result<WatcherHandle> {
    let source = match mode {
        WatchMode::Native => Source::Native(start_native(root, tx)?),
        WatchMode::Polling => Source::Polling(poller.start(tx).await?),
        WatchMode::Auto => match start_native(root, tx.clone()) {
            Ok(watcher) => Source::Native(watcher),
            Err(err) => {
                warn!(error = %err, "native file watching unavailable; falling back to polling");
                Source::Polling(poller.start(tx).await?)
            }
        },
    };

    let handle = WatcherHandle { source };
    info!(root = %root.display(), mode = handle.mode(), "event source started");
    Ok(handle)
}

fn start_native(root: &Path, tx: mpsc::Sender<WatchInput>) -> Result<RecommendedWatcher> {
    // Called synchronously on notify's own thread, so a blocking send is fine.
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                for input in inputs_for(&event) {
                    if tx.blocking_send(input).is_err() {
                        debug!("engine gone; dropping notify event");
                        return;
                    }
                }
            }
            Err(err) => warn!(error = %err, "file watch error"),
        },
        Config::default(),
    )?;

    watcher.watch(root, RecursiveMode::Recursive)?;
    Ok(watcher)
}

/// Engine inputs for one notify event. A rescan flag (queue overflow) means
/// events were lost, whatever the event's kind.
fn inputs_for(event: &Event) -> Vec<WatchInput> {
    if event.need_rescan() {
        return vec![WatchInput::Rescan];
    }
    from_notify(event).into_iter().map(WatchInput::Raw).collect()
}
