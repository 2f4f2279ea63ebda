pub mod builders;

use std::sync::Once;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, fmt};

use fimwatch::watch::WatchDecision;

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=fimwatch=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
#[allow(dead_code)]
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// Receive decisions until none arrives for `quiet`.
pub async fn collect_decisions(
    rx: &mut mpsc::Receiver<WatchDecision>,
    quiet: Duration,
) -> Vec<WatchDecision> {
    let mut out = Vec::new();
    while let Ok(Some(decision)) = tokio::time::timeout(quiet, rx.recv()).await {
        out.push(decision);
    }
    out
}
