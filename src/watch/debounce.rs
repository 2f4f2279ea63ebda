// src/watch/debounce.rs

//! Per-path debounce registry.
//!
//! Each key moves through `Idle -> Debouncing -> Resolving -> Idle`:
//!
//! - `arm` (re)starts the key's timer. The previous timer is aborted and the
//!   generation bumped, so a late message from an old timer is ignored.
//! - `fire` is called when a timer elapses. If the key is not resolving yet,
//!   the slot is consumed and a [`PendingResolve`] is handed back. If it is,
//!   the slot is marked ready and waits.
//! - `finish` closes a resolution and hands back the waiting slot, if any.
//!
//! At most one resolution per key is ever in flight, which is what keeps
//! same-path decisions ordered. The registry is plain data; the engine task
//! owns it and does all the spawning.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use tokio::task::AbortHandle;
use tracing::debug;

use crate::watch::event::EventKind;

#[derive(Debug)]
struct Slot {
    generation: u64,
    kind: EventKind,
    abs_path: PathBuf,
    timer: Option<AbortHandle>,
    /// Timer elapsed while a previous resolution was still running.
    ready: bool,
}

/// A key whose debounce window has closed and that should be resolved now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingResolve {
    pub key: String,
    /// Last event kind observed in the window.
    pub kind: EventKind,
    pub abs_path: PathBuf,
}

#[derive(Debug, Default)]
pub struct DebounceRegistry {
    slots: HashMap<String, Slot>,
    resolving: HashSet<String>,
    next_generation: u64,
}

impl DebounceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an event for `key` and restart its timer.
    ///
    /// `start_timer` receives the new generation and must return the handle
    /// of a timer that will eventually report `(key, generation)` back.
    pub fn arm<F>(&mut self, key: String, kind: EventKind, abs_path: PathBuf, start_timer: F)
    where
        F: FnOnce(u64) -> AbortHandle,
    {
        self.next_generation += 1;
        let generation = self.next_generation;

        match self.slots.get_mut(&key) {
            Some(slot) => {
                if let Some(timer) = slot.timer.take() {
                    timer.abort();
                }
                debug!(key = %key, from = %slot.kind, to = %kind, generation, "re-armed debounce");
                slot.generation = generation;
                slot.kind = kind;
                slot.abs_path = abs_path;
                slot.ready = false;
                slot.timer = Some(start_timer(generation));
            }
            None => {
                debug!(key = %key, %kind, generation, "armed debounce");
                let timer = start_timer(generation);
                self.slots.insert(
                    key,
                    Slot {
                        generation,
                        kind,
                        abs_path,
                        timer: Some(timer),
                        ready: false,
                    },
                );
            }
        }
    }

    /// Handle an elapsed timer. Stale generations are ignored.
    pub fn fire(&mut self, key: &str, generation: u64) -> Option<PendingResolve> {
        let slot = self.slots.get_mut(key)?;
        if slot.generation != generation {
            debug!(key, generation, current = slot.generation, "ignoring stale timer");
            return None;
        }
        slot.timer = None;

        if self.resolving.contains(key) {
            debug!(key, "resolution in flight; holding fired slot");
            slot.ready = true;
            return None;
        }

        self.take_for_resolve(key)
    }

    /// Mark the resolution of `key` done, releasing a held slot if one fired
    /// meanwhile.
    pub fn finish(&mut self, key: &str) -> Option<PendingResolve> {
        self.resolving.remove(key);
        match self.slots.get(key) {
            Some(slot) if slot.ready => self.take_for_resolve(key),
            _ => None,
        }
    }

    fn take_for_resolve(&mut self, key: &str) -> Option<PendingResolve> {
        let (key, slot) = self.slots.remove_entry(key)?;
        self.resolving.insert(key.clone());
        Some(PendingResolve {
            key,
            kind: slot.kind,
            abs_path: slot.abs_path,
        })
    }

    pub fn is_resolving(&self, key: &str) -> bool {
        self.resolving.contains(key)
    }

    pub fn is_idle(&self) -> bool {
        self.slots.is_empty() && self.resolving.is_empty()
    }

    /// Abort every timer and return all keys that were debouncing or
    /// resolving, sorted.
    pub fn shutdown(&mut self) -> Vec<String> {
        let mut keys: Vec<String> = Vec::with_capacity(self.slots.len() + self.resolving.len());
        for (key, slot) in self.slots.drain() {
            if let Some(timer) = slot.timer {
                timer.abort();
            }
            keys.push(key);
        }
        keys.extend(self.resolving.drain());
        keys.sort();
        keys.dedup();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::pending;

    fn idle_timer() -> AbortHandle {
        tokio::spawn(pending::<()>()).abort_handle()
    }

    fn arm(reg: &mut DebounceRegistry, key: &str, kind: EventKind) -> u64 {
        let mut armed = 0;
        reg.arm(key.into(), kind, PathBuf::from(format!("/t/{key}")), |g| {
            armed = g;
            idle_timer()
        });
        armed
    }

    #[tokio::test]
    async fn rearm_keeps_last_kind_and_invalidates_old_generation() {
        let mut reg = DebounceRegistry::new();
        let g1 = arm(&mut reg, "a", EventKind::Created);
        let g2 = arm(&mut reg, "a", EventKind::Deleted);
        assert!(g2 > g1);

        assert_eq!(reg.fire("a", g1), None);
        let pending = reg.fire("a", g2).unwrap();
        assert_eq!(pending.kind, EventKind::Deleted);
        assert!(reg.is_resolving("a"));
    }

    #[tokio::test]
    async fn rearm_aborts_previous_timer() {
        let mut reg = DebounceRegistry::new();
        let first = tokio::spawn(pending::<()>());
        let handle = first.abort_handle();
        reg.arm("a".into(), EventKind::Modified, "/t/a".into(), |_| handle);
        arm(&mut reg, "a", EventKind::Modified);

        let err = first.await.unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn fire_during_resolution_waits_for_finish() {
        let mut reg = DebounceRegistry::new();
        let g = arm(&mut reg, "a", EventKind::Modified);
        assert!(reg.fire("a", g).is_some());

        let g = arm(&mut reg, "a", EventKind::Deleted);
        assert_eq!(reg.fire("a", g), None);

        let next = reg.finish("a").unwrap();
        assert_eq!(next.kind, EventKind::Deleted);
        assert!(reg.finish("a").is_none());
        assert!(reg.is_idle());
    }

    #[tokio::test]
    async fn shutdown_reports_debouncing_and_resolving_keys() {
        let mut reg = DebounceRegistry::new();
        let g = arm(&mut reg, "b", EventKind::Modified);
        reg.fire("b", g);
        arm(&mut reg, "a", EventKind::Created);
        arm(&mut reg, "b", EventKind::Modified);

        assert_eq!(reg.shutdown(), vec!["a".to_string(), "b".to_string()]);
        assert!(reg.is_idle());
    }
}
