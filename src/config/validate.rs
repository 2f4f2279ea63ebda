// src/config/validate.rs

use std::path::PathBuf;
use std::time::Duration;

use crate::baseline::scanner::default_case_insensitive;
use crate::config::model::RawConfigFile;
use crate::config::settings::{DEFAULT_BASELINE, DEFAULT_LOG, DEFAULT_TARGET, Settings};
use crate::errors::{FimError, Result};
use crate::exclude::ExclusionMatcher;
use crate::types::{HashAlgorithm, WatchMode};

impl TryFrom<RawConfigFile> for Settings {
    type Error = FimError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;

        let hash_algorithm = parse_algorithm(raw.hash_algorithm.as_deref())?;
        let watch_mode = raw
            .watch
            .mode
            .parse::<WatchMode>()
            .map_err(|e| FimError::ConfigError(format!("[watch].mode: {e}")))?;

        Ok(Settings {
            target: raw.target.unwrap_or_else(|| PathBuf::from(DEFAULT_TARGET)),
            baseline: raw.baseline.unwrap_or_else(|| PathBuf::from(DEFAULT_BASELINE)),
            log: raw.log.unwrap_or_else(|| PathBuf::from(DEFAULT_LOG)),
            exclude: raw.exclude,
            hash_algorithm,
            debounce: Duration::from_millis(raw.watch.debounce_ms),
            retry_delay: Duration::from_millis(raw.watch.retry_ms),
            poll_interval: Duration::from_millis(raw.watch.poll_interval_ms),
            watch_mode,
            reconcile_on_start: raw.watch.reconcile_on_start,
            workers: raw.scan.workers,
            case_insensitive: raw
                .scan
                .case_insensitive
                .unwrap_or_else(default_case_insensitive),
        })
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_watch_section(cfg)?;
    validate_scan_section(cfg)?;
    // Compile once here so a bad glob is reported before any scanning.
    ExclusionMatcher::new(&cfg.exclude)?;
    Ok(())
}

fn validate_watch_section(cfg: &RawConfigFile) -> Result<()> {
    let watch = &cfg.watch;
    if watch.debounce_ms == 0 {
        return Err(FimError::ConfigError(
            "[watch].debounce_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    if watch.retry_ms == 0 {
        return Err(FimError::ConfigError(
            "[watch].retry_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    if watch.poll_interval_ms < 10 {
        return Err(FimError::ConfigError(format!(
            "[watch].poll_interval_ms must be >= 10 (got {})",
            watch.poll_interval_ms
        )));
    }
    Ok(())
}

fn validate_scan_section(cfg: &RawConfigFile) -> Result<()> {
    if cfg.scan.workers == 0 {
        return Err(FimError::ConfigError(
            "[scan].workers must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn parse_algorithm(value: Option<&str>) -> Result<HashAlgorithm> {
    match value {
        None => Ok(HashAlgorithm::default()),
        Some(s) => s
            .parse()
            .map_err(|_| FimError::UnsupportedHashAlgorithm(s.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let s = Settings::try_from(RawConfigFile::default()).unwrap();
        assert_eq!(s.target, PathBuf::from("."));
        assert_eq!(s.baseline, PathBuf::from("baseline.json"));
        assert_eq!(s.debounce, Duration::from_millis(600));
        assert_eq!(s.retry_delay, Duration::from_millis(500));
        assert_eq!(s.watch_mode, WatchMode::Auto);
        assert_eq!(s.hash_algorithm, HashAlgorithm::Sha256);
        assert!(s.reconcile_on_start);
    }

    #[test]
    fn zero_intervals_are_rejected() {
        let mut raw = RawConfigFile::default();
        raw.watch.debounce_ms = 0;
        assert!(matches!(Settings::try_from(raw), Err(FimError::ConfigError(_))));

        let mut raw = RawConfigFile::default();
        raw.watch.poll_interval_ms = 5;
        assert!(matches!(Settings::try_from(raw), Err(FimError::ConfigError(_))));

        let mut raw = RawConfigFile::default();
        raw.scan.workers = 0;
        assert!(matches!(Settings::try_from(raw), Err(FimError::ConfigError(_))));
    }

    #[test]
    fn unknown_algorithm_and_mode_are_rejected() {
        let mut raw = RawConfigFile::default();
        raw.hash_algorithm = Some("md5".into());
        assert!(matches!(
            Settings::try_from(raw),
            Err(FimError::UnsupportedHashAlgorithm(_))
        ));

        let mut raw = RawConfigFile::default();
        raw.watch.mode = "inotify".into();
        assert!(matches!(Settings::try_from(raw), Err(FimError::ConfigError(_))));
    }

    #[test]
    fn bad_glob_is_rejected() {
        let mut raw = RawConfigFile::default();
        raw.exclude = vec!["src/[".into()];
        assert!(matches!(
            Settings::try_from(raw),
            Err(FimError::InvalidPattern { .. })
        ));
    }
}
