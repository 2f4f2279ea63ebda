// src/watch/mod.rs

//! Continuous monitoring.
//!
//! This module is responsible for:
//! - Classifying raw notifications (native or polled) into [`RawEvent`]s.
//! - Debouncing bursts per path and resolving each path once against the
//!   baseline, with a single retry for unreadable files.
//! - Wiring up the event source (`notify`, or the polling fallback).
//!
//! It does **not** write anything; decisions go out on a channel and the
//! caller reports and logs them.

pub mod debounce;
pub mod decision;
pub mod engine;
pub mod event;
pub mod poller;
pub mod resolve;
pub mod watcher;

pub use decision::{ShutdownReport, WatchDecision};
pub use engine::{WatchEngine, WatchInput, WatchOptions};
pub use event::{EventKind, NormalizedEvent, RawEvent, from_notify, normalize};
pub use poller::{PollState, Poller};
pub use watcher::{WatcherHandle, spawn_event_source};
