use std::fs;
use std::time::Duration;

use anyhow::Result;

use fimwatch::config::{Overrides, load_and_resolve};
use fimwatch::errors::FimError;
use fimwatch::types::{HashAlgorithm, WatchMode};

#[test]
fn file_values_then_command_line_overrides() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = dir.path().join("fimwatch.toml");
    fs::write(
        &config,
        r#"
target = "tree"
baseline = "state/baseline.json"
exclude = ["*.log", "!keep.log"]
hash_algorithm = "blake3"

[watch]
debounce_ms = 250
retry_ms = 75
mode = "polling"

[scan]
workers = 8
"#,
    )?;

    let overrides = Overrides {
        exclude: vec!["*.tmp".to_string()],
        debounce_ms: Some(100),
        ..Overrides::default()
    };
    let settings = load_and_resolve(Some(config.as_path()), &overrides)?;

    // Relative paths in the file are relative to the file.
    assert_eq!(settings.target, dir.path().join("tree"));
    assert_eq!(settings.baseline, dir.path().join("state/baseline.json"));
    assert_eq!(settings.exclude, vec!["*.log", "!keep.log", "*.tmp"]);
    assert_eq!(settings.hash_algorithm, HashAlgorithm::Blake3);
    assert_eq!(settings.debounce, Duration::from_millis(100));
    assert_eq!(settings.retry_delay, Duration::from_millis(75));
    assert_eq!(settings.watch_mode, WatchMode::Polling);
    assert_eq!(settings.workers, 8);
    Ok(())
}

#[test]
fn command_line_target_wins_over_file() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = dir.path().join("fimwatch.toml");
    fs::write(&config, "target = \"from-file\"\n")?;

    let overrides = Overrides {
        target: Some("/srv/data".into()),
        force_polling: true,
        ..Overrides::default()
    };
    let settings = load_and_resolve(Some(config.as_path()), &overrides)?;
    assert_eq!(settings.target, std::path::PathBuf::from("/srv/data"));
    assert_eq!(settings.watch_mode, WatchMode::Polling);
    Ok(())
}

#[test]
fn unknown_keys_are_rejected() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = dir.path().join("fimwatch.toml");
    fs::write(&config, "[watch]\ndebounce = 5\n")?;

    let err = load_and_resolve(Some(config.as_path()), &Overrides::default()).unwrap_err();
    assert!(matches!(err, FimError::TomlError(_)));
    Ok(())
}

#[test]
fn explicit_missing_config_is_an_error() {
    let err = load_and_resolve(
        Some(std::path::Path::new("/definitely/not/here.toml")),
        &Overrides::default(),
    )
    .unwrap_err();
    assert!(matches!(err, FimError::ConfigError(_)));
}

#[test]
fn invalid_override_values_are_rejected() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = dir.path().join("fimwatch.toml");
    fs::write(&config, "")?;

    let bad_algorithm = Overrides {
        hash_algorithm: Some("md5".to_string()),
        ..Overrides::default()
    };
    let err = load_and_resolve(Some(config.as_path()), &bad_algorithm).unwrap_err();
    assert!(matches!(err, FimError::UnsupportedHashAlgorithm(_)));

    let zero_debounce = Overrides {
        debounce_ms: Some(0),
        ..Overrides::default()
    };
    let err = load_and_resolve(Some(config.as_path()), &zero_debounce).unwrap_err();
    assert!(matches!(err, FimError::ConfigError(_)));
    Ok(())
}
