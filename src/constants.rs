//! Global constants used throughout the updater.
//!
//! Timeouts, thresholds, and file naming conventions shared between the
//! downloader, the appcast model, and the update engine.

use std::time::Duration;

/// Default timeout applied to every update-related request (30 seconds).
pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(30);

/// Interval of the passive scheduler driving `EveryHour` checks.
pub const SCHEDULED_CHECK_INTERVAL: Duration = Duration::from_secs(3600);

/// Smallest expected body size for which download progress is reported.
///
/// Bodies below this size complete too quickly for percentages to be useful,
/// and servers that omit `Content-Length` report nothing at all.
pub const MIN_PROGRESS_TOTAL_BYTES: u64 = 1000;

/// Extension appended to a file while it is being downloaded.
pub const PARTIAL_FILE_EXTENSION: &str = "part";

/// Base name of the saved appcast when the manifest has no installer URL.
pub const FALLBACK_MANIFEST_NAME: &str = "appcast";

/// Date format of the appcast `date` field (`dd/MM/yyyy`).
pub const APPCAST_DATE_FORMAT: &str = "%d/%m/%Y";

/// Buffer size used when hashing files.
pub const CHECKSUM_BUFFER_SIZE: usize = 8192;

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("appcast-updater/", env!("CARGO_PKG_VERSION"));
