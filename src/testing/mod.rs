//! Test support: mock collaborators and logging helpers.

pub mod mocks;

use once_cell::sync::Lazy;

static TEST_TRACING: Lazy<()> = Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
});

/// Install a test-friendly tracing subscriber once per process. Safe to call
/// from every test.
pub fn init_test_logging() {
    Lazy::force(&TEST_TRACING);
}
