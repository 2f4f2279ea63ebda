// src/lib.rs

pub mod baseline;
pub mod cli;
pub mod commands;
pub mod config;
pub mod errors;
pub mod exclude;
pub mod fs;
pub mod logging;
pub mod paths;
pub mod report;
pub mod storage;
pub mod types;
pub mod watch;

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, warn};

use crate::cli::{CliArgs, Command};
use crate::commands::Context;
use crate::config::load_and_resolve;
use crate::fs::RealFileSystem;
use crate::storage::JsonStore;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (file + command-line overrides)
/// - JSON storage for the baseline and change log
/// - the selected command
/// - Ctrl-C handling for `watch`
pub async fn run(args: CliArgs) -> Result<()> {
    let settings = load_and_resolve(args.config_path(), &args.overrides())?;
    debug!(?settings, "resolved settings");

    let store = Arc::new(JsonStore::new(&settings.baseline, &settings.log));
    let ctx = Context::new(settings, Arc::new(RealFileSystem), store);

    match &args.command {
        Command::Init(_) => {
            let outcome = commands::run_init(&ctx)?;
            report::print_init(&outcome);
        }
        Command::Check(_) => {
            let check = commands::run_check(&ctx)?;
            report::print_check(&check);
        }
        Command::Update(update) => {
            let outcome = commands::run_update(&ctx, update.yes, |check| {
                report::print_check(check);
                Ok(report::confirm("\nApply these changes to baseline?")?)
            })?;
            if update.yes {
                if let commands::UpdateOutcome::Applied { report: check, .. } = &outcome {
                    report::print_check(check);
                }
            }
            report::print_update(&outcome);
        }
        Command::Watch(_) => {
            report::print_watch_start(&ctx.settings.target.display().to_string());
            let summary = commands::run_watch(&ctx, ctrl_c(), report::print_decision).await?;
            report::print_watch_summary(&summary);
        }
    }

    Ok(())
}

/// Resolves on Ctrl-C. If the signal cannot be installed it never resolves.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}
