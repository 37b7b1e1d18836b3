//! Helpers shared between unit tests.

use once_cell::sync::Lazy;

static LOGGER_INIT: Lazy<()> = Lazy::new(|| {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
});

/// Installs the test log subscriber once per process.
pub fn enable_logger() {
    *LOGGER_INIT;
}
