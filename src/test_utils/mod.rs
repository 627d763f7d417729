//! Test utilities for the updater
//!
//! Available to unit tests and, through the `test-utils` feature, to the
//! integration suite:
//! - [`init_test_logging`] - one-time tracing setup honoring `RUST_LOG`
//! - [`AppcastFixture`] - appcast documents shaped like a real update server
//! - [`RecordingLauncher`] - an installer launcher that only records calls
//!
//! # Example
//!
//! ```rust,no_run
//! use appcast_updater::test_utils::{AppcastFixture, init_test_logging};
//!
//! init_test_logging(None);
//! let json = AppcastFixture::new("2.0.0", "http://127.0.0.1:8080").to_json();
//! assert!(json.contains("installer-2.0.exe"));
//! ```

pub mod fixtures;

pub use fixtures::{AppcastFixture, RecordingLauncher};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Uses `level` when given, otherwise `RUST_LOG` when set; without either,
/// tests stay silent.
///
/// ```bash
/// RUST_LOG=appcast_updater=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
