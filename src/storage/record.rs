// src/storage/record.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::baseline::ChangeEntry;
use crate::watch::WatchDecision;

/// Command that produced a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogEvent {
    Init,
    Check,
    Update,
    Watch,
}

/// One line of the append-only change log.
///
/// Change records carry `path` and `change_type`. Summary records (one per
/// command run) carry counts instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub event: LogEvent,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// `created`, `modified`, `deleted` or `unreadable`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unreadable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retried: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skipped: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup: Option<String>,
}

impl LogRecord {
    fn base(event: LogEvent, target: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            event,
            target: target.to_string(),
            path: None,
            change_type: None,
            hash: None,
            unreadable: None,
            retried: None,
            files: None,
            skipped: None,
            backup: None,
        }
    }

    /// Per-run summary.
    pub fn summary(event: LogEvent, target: &str, files: usize, skipped: usize) -> Self {
        Self {
            files: Some(files),
            skipped: Some(skipped),
            ..Self::base(event, target)
        }
    }

    pub fn with_backup(mut self, backup: Option<String>) -> Self {
        self.backup = backup;
        self
    }

    /// A change found by `check` or `update`.
    pub fn change(event: LogEvent, target: &str, entry: &ChangeEntry) -> Self {
        Self {
            path: Some(entry.path().to_string()),
            change_type: Some(entry.kind().as_str().to_string()),
            hash: entry.record().map(|r| r.hash.clone()),
            ..Self::base(event, target)
        }
    }

    /// A tracked file that could not be read during a scan.
    pub fn unreadable(event: LogEvent, target: &str, path: &str) -> Self {
        Self {
            path: Some(path.to_string()),
            change_type: Some("unreadable".to_string()),
            ..Self::base(event, target)
        }
    }

    /// A decision from the watch engine.
    pub fn decision(target: &str, decision: &WatchDecision) -> Self {
        Self {
            unreadable: Some(decision.unreadable),
            retried: Some(decision.retried),
            ..Self::change(LogEvent::Watch, target, &decision.entry)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_omits_change_fields() {
        let record = LogRecord::summary(LogEvent::Init, "/t", 3, 1);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["event"], "init");
        assert_eq!(json["files"], 3);
        assert!(json.get("path").is_none());
        assert!(json.get("change_type").is_none());
    }

    #[test]
    fn deletion_has_no_hash() {
        let entry = ChangeEntry::Deleted { path: "a".into() };
        let json = serde_json::to_value(LogRecord::change(LogEvent::Check, "/t", &entry)).unwrap();
        assert_eq!(json["change_type"], "deleted");
        assert!(json.get("hash").is_none());
    }
}
