// src/commands/update.rs

use std::path::PathBuf;

use tracing::info;

use crate::baseline::Snapshot;
use crate::commands::Context;
use crate::commands::check::{CheckReport, evaluate, log_report};
use crate::errors::Result;
use crate::storage::{LogEvent, LogRecord};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Nothing changed; the baseline was left alone.
    UpToDate(CheckReport),
    /// The operator declined.
    Cancelled(CheckReport),
    Applied {
        report: CheckReport,
        backup: Option<PathBuf>,
    },
}

/// Rescan, show the differences and replace the baseline.
///
/// `confirm` is asked unless `assume_yes` is set. The old baseline is backed
/// up before it is replaced; if the backup fails nothing is written.
/// The baseline's hash algorithm is kept.
pub fn run_update<F>(ctx: &Context, assume_yes: bool, confirm: F) -> Result<UpdateOutcome>
where
    F: FnOnce(&CheckReport) -> Result<bool>,
{
    let (baseline, outcome, report) = evaluate(ctx)?;

    if report.changes.is_empty() {
        info!("baseline already up to date");
        return Ok(UpdateOutcome::UpToDate(report));
    }

    if !assume_yes && !confirm(&report)? {
        info!("update cancelled");
        return Ok(UpdateOutcome::Cancelled(report));
    }

    let backup = ctx.store.backup_baseline()?;

    let mut files = outcome.snapshot.files;
    // Tracked files that could not be read keep their last known record.
    for path in &report.unreadable {
        if let Some(record) = baseline.get(path) {
            files.insert(path.clone(), record.clone());
        }
    }
    let snapshot = Snapshot::new(report.target.clone(), baseline.hash_algorithm, files);
    ctx.store.save_baseline(&snapshot)?;

    log_report(ctx, LogEvent::Update, &report)?;
    ctx.store.append_log_record(
        &LogRecord::summary(
            LogEvent::Update,
            &report.target,
            snapshot.len(),
            report.skipped.len(),
        )
        .with_backup(backup.as_ref().map(|p| p.display().to_string())),
    )?;

    info!(files = snapshot.len(), "baseline updated");
    Ok(UpdateOutcome::Applied { report, backup })
}
