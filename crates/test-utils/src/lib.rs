pub mod builders;
pub mod fake_runner;
pub mod static_extractor;

use std::sync::{Arc, Once};
use std::time::Duration;

use taskgraph::exec::{CommandRunner, RetryPolicy, TaskExecutor};
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
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
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// Backoff short enough that retry tests stay fast.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(Duration::from_millis(1), Duration::from_millis(20))
}

/// Executor over `runner` with [`fast_retry`] and a 30s default timeout.
pub fn executor_with(runner: Arc<dyn CommandRunner>) -> Arc<TaskExecutor> {
    Arc::new(TaskExecutor::new(runner, fast_retry(), Duration::from_secs(30)))
}
