use std::sync::Once;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, fmt};

/// Environment variable that enables log output in tests.
const ENABLE_TRACING_ENV: &str = "ENABLE_TRACING";

// Test binaries call `init_test_tracing` from every test, and the global subscriber can only be
// installed once per process.
static TEST_TRACING: Once = Once::new();

/// Installs the global subscriber for a binary named `app_name`.
///
/// Filtering follows `RUST_LOG` when it is set and defaults to `info` for the binary and the
/// pipeline engine otherwise.
pub fn init_tracing(app_name: &str) -> Result<(), TryInitError> {
    let default_filter = format!(
        "{}=info,etl=info,etl_connectors=info",
        app_name.replace('-', "_")
    );

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(fmt::layer())
        .try_init()
}

/// Installs a subscriber writing through the test harness.
///
/// Nothing is printed unless `ENABLE_TRACING` is set, so `cargo test` output stays readable.
/// Subsequent calls are no-ops.
pub fn init_test_tracing() {
    TEST_TRACING.call_once(|| {
        if std::env::var_os(ENABLE_TRACING_ENV).is_none() {
            return;
        }

        let _ = tracing_subscriber::registry()
            .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "debug".into()))
            .with(fmt::layer().with_test_writer())
            .try_init();
    });
}
