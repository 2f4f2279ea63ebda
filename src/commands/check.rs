// src/commands/check.rs

use tracing::{info, warn};

use crate::baseline::{ChangeEntry, ChangeKind, ChangeSummary, ScanOutcome, Snapshot, compare, scan};
use crate::commands::Context;
use crate::errors::Result;
use crate::storage::{LogEvent, LogRecord};

/// Result of comparing the current tree with the baseline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    pub target: String,
    /// Created, modified and deleted files, sorted by path.
    pub changes: Vec<ChangeEntry>,
    /// Tracked files that exist but could not be read. These are not
    /// reported as deleted.
    pub unreadable: Vec<String>,
    /// Everything the scan skipped, tracked or not.
    pub skipped: Vec<String>,
    pub scanned: usize,
}

impl CheckReport {
    pub fn summary(&self) -> ChangeSummary {
        ChangeSummary::of(&self.changes)
    }

    pub fn is_clean(&self) -> bool {
        self.changes.is_empty() && self.unreadable.is_empty()
    }
}

/// Load the baseline, rescan and diff. Shared by `check` and `update`.
pub(crate) fn evaluate(ctx: &Context) -> Result<(Snapshot, ScanOutcome, CheckReport)> {
    let baseline = ctx.store.load_baseline()?;
    let root = ctx.root()?;
    let matcher = ctx.settings.matcher()?;

    if baseline.hash_algorithm != ctx.settings.hash_algorithm {
        warn!(
            baseline = %baseline.hash_algorithm,
            configured = %ctx.settings.hash_algorithm,
            "baseline uses a different hash algorithm; comparing with the baseline's"
        );
    }
    let mut options = ctx.settings.scan_options();
    options.algorithm = baseline.hash_algorithm;

    let outcome = scan(ctx.fs.as_ref(), &root, &matcher, &options)?;

    let (unreadable, changes): (Vec<ChangeEntry>, Vec<ChangeEntry>) = compare(&baseline, &outcome.snapshot)
        .into_iter()
        .partition(|c| c.kind() == ChangeKind::Deleted && outcome.was_skipped(c.path()));

    let report = CheckReport {
        target: root.display().to_string(),
        changes,
        unreadable: unreadable.iter().map(|c| c.path().to_string()).collect(),
        skipped: outcome.skipped.clone(),
        scanned: outcome.snapshot.len(),
    };
    Ok((baseline, outcome, report))
}

/// Write one record per change and unreadable file.
pub(crate) fn log_report(ctx: &Context, event: LogEvent, report: &CheckReport) -> Result<()> {
    for change in &report.changes {
        ctx.store
            .append_log_record(&LogRecord::change(event, &report.target, change))?;
    }
    for path in &report.unreadable {
        ctx.store
            .append_log_record(&LogRecord::unreadable(event, &report.target, path))?;
    }
    Ok(())
}

/// Compare the target with the stored baseline.
pub fn run_check(ctx: &Context) -> Result<CheckReport> {
    let (_, _, report) = evaluate(ctx)?;

    log_report(ctx, LogEvent::Check, &report)?;
    ctx.store.append_log_record(&LogRecord::summary(
        LogEvent::Check,
        &report.target,
        report.scanned,
        report.skipped.len(),
    ))?;

    let summary = report.summary();
    info!(
        created = summary.created,
        modified = summary.modified,
        deleted = summary.deleted,
        unreadable = report.unreadable.len(),
        "check complete"
    );
    Ok(report)
}
