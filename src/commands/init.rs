// src/commands/init.rs

use std::path::PathBuf;

use tracing::info;

use crate::baseline::scan;
use crate::commands::Context;
use crate::errors::Result;
use crate::storage::{LogEvent, LogRecord};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitOutcome {
    pub target: String,
    pub files: usize,
    pub skipped: Vec<String>,
    /// Copy of the baseline that was replaced, if there was one.
    pub backup: Option<PathBuf>,
    pub baseline_path: PathBuf,
}

/// Scan the target and write a fresh baseline.
pub fn run_init(ctx: &Context) -> Result<InitOutcome> {
    let root = ctx.root()?;
    let matcher = ctx.settings.matcher()?;
    let target = root.display().to_string();

    info!(target = %target, algorithm = %ctx.settings.hash_algorithm, "building baseline");
    let outcome = scan(ctx.fs.as_ref(), &root, &matcher, &ctx.settings.scan_options())?;

    let backup = ctx.store.backup_baseline()?;
    ctx.store.save_baseline(&outcome.snapshot)?;

    let files = outcome.snapshot.len();
    ctx.store.append_log_record(
        &LogRecord::summary(LogEvent::Init, &target, files, outcome.skipped.len())
            .with_backup(backup.as_ref().map(|p| p.display().to_string())),
    )?;

    Ok(InitOutcome {
        target,
        files,
        skipped: outcome.skipped,
        backup,
        baseline_path: ctx.settings.baseline.clone(),
    })
}
