// src/report.rs

//! Human-readable output on stdout.

use std::io::{self, BufRead, Write};

use crate::baseline::{ChangeEntry, ChangeKind};
use crate::commands::{CheckReport, InitOutcome, UpdateOutcome, WatchSummary};
use crate::watch::WatchDecision;

pub fn print_init(outcome: &InitOutcome) {
    println!("Scanned {}", outcome.target);
    if let Some(backup) = &outcome.backup {
        println!("Previous baseline backed up to {}", backup.display());
    }
    println!(
        "Baseline with {} files saved to {}",
        outcome.files,
        outcome.baseline_path.display()
    );
    print_skipped(&outcome.skipped);
}

pub fn print_check(report: &CheckReport) {
    if report.is_clean() {
        println!("No changes detected. Everything is clean.");
        return;
    }

    println!("=== Changes Detected ===");
    for (kind, title, marker) in [
        (ChangeKind::Created, "CREATED", '+'),
        (ChangeKind::Modified, "MODIFIED", '*'),
        (ChangeKind::Deleted, "DELETED", '-'),
    ] {
        let paths: Vec<&str> = report
            .changes
            .iter()
            .filter(|c| c.kind() == kind)
            .map(ChangeEntry::path)
            .collect();
        if !paths.is_empty() {
            println!("\n[{title}]");
            for p in paths {
                println!(" {marker} {p}");
            }
        }
    }

    if !report.unreadable.is_empty() {
        println!("\n[UNREADABLE]");
        for p in &report.unreadable {
            println!(" ? {p}");
        }
    }

    let s = report.summary();
    println!(
        "\n{} created, {} modified, {} deleted, {} unreadable",
        s.created,
        s.modified,
        s.deleted,
        report.unreadable.len()
    );
}

pub fn print_update(outcome: &UpdateOutcome) {
    match outcome {
        UpdateOutcome::UpToDate(_) => println!("No changes found. Baseline is already up-to-date."),
        UpdateOutcome::Cancelled(_) => println!("Update cancelled."),
        UpdateOutcome::Applied { backup, .. } => {
            if let Some(backup) = backup {
                println!("Backup created: {}", backup.display());
            }
            println!("Baseline updated.");
        }
    }
}

pub fn print_decision(decision: &WatchDecision) {
    let suffix = match (decision.unreadable, decision.retried) {
        (true, _) => " (unreadable)",
        (false, true) => " (after retry)",
        (false, false) => "",
    };
    println!(
        "[{}] {}{suffix}",
        decision.kind().as_str().to_uppercase(),
        decision.path()
    );
}

pub fn print_watch_start(target: &str) {
    println!("Watching {target} for changes... (Ctrl+C to stop)");
}

pub fn print_watch_summary(summary: &WatchSummary) {
    println!(
        "Stopped ({} mode): {} decisions, {} deferred",
        summary.mode,
        summary.decisions,
        summary.deferred.len()
    );
    for key in &summary.deferred {
        println!(" ~ {key}");
    }
}

fn print_skipped(skipped: &[String]) {
    if skipped.is_empty() {
        return;
    }
    println!("Skipped {} unreadable entries:", skipped.len());
    for p in skipped {
        println!(" ? {p}");
    }
}

/// Ask a yes/no question on stdin. Anything but `y`/`yes` is a no.
pub fn confirm(question: &str) -> io::Result<bool> {
    print!("{question} (y/N): ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(matches!(line.trim().to_lowercase().as_str(), "y" | "yes"))
}
