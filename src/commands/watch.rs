// src/commands/watch.rs

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::baseline::{ChangeEntry, ChangeKind, compare, scan};
use crate::commands::Context;
use crate::errors::{FimError, Result};
use crate::storage::{LogEvent, LogRecord};
use crate::watch::{Poller, WatchDecision, WatchEngine, WatchInput, spawn_event_source};

const INPUT_CAPACITY: usize = 1024;
const DECISION_CAPACITY: usize = 256;

/// What happened during one watch session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchSummary {
    /// Changes found by the start-up reconciliation scan.
    pub reconciled: Vec<ChangeEntry>,
    /// Tracked files the reconciliation scan could not read.
    pub reconciled_unreadable: Vec<String>,
    pub decisions: usize,
    /// Keys that were still pending at shutdown.
    pub deferred: Vec<String>,
    /// `"native"` or `"polling"`.
    pub mode: String,
}

/// Monitor the target until `shutdown` completes.
///
/// `on_decision` is called for every decision (after it has been logged),
/// for console output.
pub async fn run_watch<S, D>(ctx: &Context, shutdown: S, mut on_decision: D) -> Result<WatchSummary>
where
    S: Future<Output = ()> + Send + 'static,
    D: FnMut(&WatchDecision),
{
    let baseline = Arc::new(ctx.store.load_baseline()?);
    let root = ctx.root()?;
    let target = root.display().to_string();
    let matcher = Arc::new(ctx.settings.matcher()?);

    let mut options = ctx.settings.scan_options();
    options.algorithm = baseline.hash_algorithm;

    let mut summary = WatchSummary::default();

    // The event source starts before reconciliation so nothing changed in
    // between goes unseen; its events queue until the engine runs.
    let (input_tx, input_rx) = mpsc::channel::<WatchInput>(INPUT_CAPACITY);
    let (decision_tx, mut decision_rx) = mpsc::channel::<WatchDecision>(DECISION_CAPACITY);

    let poller = Poller::new(
        Arc::clone(&ctx.fs),
        root.clone(),
        Arc::clone(&matcher),
        options,
        ctx.settings.poll_interval,
    );
    let source = spawn_event_source(&root, ctx.settings.watch_mode, poller, input_tx.clone()).await?;
    summary.mode = source.mode().to_string();

    if ctx.settings.reconcile_on_start {
        let outcome = scan(ctx.fs.as_ref(), &root, &matcher, &options)?;
        for change in compare(&baseline, &outcome.snapshot) {
            if change.kind() == ChangeKind::Deleted && outcome.was_skipped(change.path()) {
                ctx.store.append_log_record(&LogRecord::unreadable(
                    LogEvent::Watch,
                    &target,
                    change.path(),
                ))?;
                summary.reconciled_unreadable.push(change.path().to_string());
            } else {
                warn!(path = %change.path(), kind = %change.kind(), "changed while not watching");
                ctx.store
                    .append_log_record(&LogRecord::change(LogEvent::Watch, &target, &change))?;
                summary.reconciled.push(change);
            }
        }
        info!(
            changes = summary.reconciled.len(),
            unreadable = summary.reconciled_unreadable.len(),
            "start-up reconciliation complete"
        );
    }

    let engine = WatchEngine::new(
        root.clone(),
        Arc::clone(&baseline),
        matcher,
        Arc::clone(&ctx.fs),
        ctx.settings.watch_options(baseline.hash_algorithm),
    );
    let engine_task = tokio::spawn(engine.run(input_rx, decision_tx));

    // Shutdown trigger → engine.
    tokio::spawn(async move {
        shutdown.await;
        let _ = input_tx.send(WatchInput::Shutdown).await;
    });

    while let Some(decision) = decision_rx.recv().await {
        if let Err(e) = ctx
            .store
            .append_log_record(&LogRecord::decision(&target, &decision))
        {
            warn!(path = %decision.path(), error = %e, "failed to log decision");
        }
        on_decision(&decision);
        summary.decisions += 1;
    }

    let report = engine_task
        .await
        .map_err(|e| FimError::Other(anyhow::anyhow!("watch engine task failed: {e}")))??;
    drop(source);

    for key in &report.deferred {
        info!(key = %key, "pending change deferred to next start");
    }
    summary.deferred = report.deferred;
    Ok(summary)
}
