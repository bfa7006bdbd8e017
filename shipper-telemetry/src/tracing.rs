use std::sync::Once;

use tracing_subscriber::EnvFilter;

/// Default directive applied when `RUST_LOG` is not set.
const DEFAULT_DIRECTIVE: &str = "info";

// Tests run in the same process, so the subscriber must be installed at
// most once across all of them.
static INIT_TEST_TRACING: Once = Once::new();

/// Initializes the global tracing subscriber for a service binary.
///
/// Reads filtering directives from `RUST_LOG`, defaulting to `info`, and
/// emits human-readable output with thread ids and targets. Panics if a
/// global subscriber is already installed, since a service must own its
/// logging setup.
pub fn init_tracing(service_name: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_ids(true)
        .with_target(true)
        .init();

    ::tracing::info!(service = service_name, "tracing initialized");
}

/// Initializes tracing for tests.
///
/// Safe to call from every test; only the first call installs the
/// subscriber. Output is compact and honors `RUST_LOG` so individual test
/// runs can be made verbose without code changes.
pub fn init_test_tracing() {
    INIT_TEST_TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .compact()
            .init();
    });
}
