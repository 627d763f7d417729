//! Persistent key-value settings used by the update engine
//!
//! The engine persists three values between runs:
//!
//! | Key | Value |
//! |-----|-------|
//! | [`LAST_CHECK_TIME_KEY`] | RFC 3339 timestamp of the last forced check |
//! | [`CHECK_FREQUENCY_KEY`] | variant name of the configured [`CheckFrequency`](crate::engine::CheckFrequency) |
//! | [`LAST_MANIFEST_KEY`] | path of the last saved appcast |
//!
//! Storage is abstracted behind [`SettingsStore`] so hosts can plug in their
//! own backend. [`FileSettings`] stores a flat TOML table on disk and
//! [`MemorySettings`] keeps everything in memory for tests.

mod file;
mod memory;

pub use file::FileSettings;
pub use memory::MemorySettings;

use anyhow::Result;

pub const LAST_CHECK_TIME_KEY: &str = "update.last_check_time";
pub const CHECK_FREQUENCY_KEY: &str = "update.check_frequency";
pub const LAST_MANIFEST_KEY: &str = "update.last_manifest";

/// String key-value storage shared between the engine and its host.
///
/// Implementations use interior mutability; the engine holds them as
/// `Arc<dyn SettingsStore>`.
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;
}
