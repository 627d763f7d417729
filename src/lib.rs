//! appcast-updater - self-update engine for desktop applications
//!
//! An application publishes a small JSON *appcast* per platform on an update
//! server. This crate fetches it, decides whether a newer version exists,
//! downloads the changelog and installer with progress and cancellation,
//! verifies the installer checksum, and installs it by launching it or by
//! moving it into a directory.
//!
//! # Architecture Overview
//!
//! - [`downloader`] performs one streamed HTTP transfer at a time, to a file
//!   (through a `.part` file renamed on success) or to memory
//! - [`appcast`] parses and validates appcast documents and tracks what has
//!   been downloaded for a version ([`appcast::UpdateRecord`])
//! - [`engine`] is the state machine tying it together; it reports every
//!   change as an [`engine::UpdateEvent`]
//! - [`settings`] persists the last check time, the check frequency and the
//!   last saved appcast between runs
//! - [`config`] describes the host application and its update channel
//! - [`launcher`] starts installers as detached processes
//! - [`cli`] is the `appcast` command-line front end
//!
//! # Appcast Format
//!
//! ```json
//! {
//!   "version": "2.0.0",
//!   "date": "01/01/2021",
//!   "checksum": "65a8e27d8879283831b664bd8b7f0ad4",
//!   "checksumType": "md5",
//!   "installerUrl": "https://updates.example.com/my-app/win/installer-2.0.exe",
//!   "changelogUrl": "https://updates.example.com/my-app/changelog-2.0.md"
//! }
//! ```
//!
//! `version` is required; `date` uses `dd/mm/yyyy`; `checksumType` is one of
//! `md5`, `sha1`, `sha256` or absent.
//!
//! # Example
//!
//! ```rust,no_run
//! use appcast_updater::config::UpdaterConfig;
//! use appcast_updater::engine::UpdateEngine;
//! use appcast_updater::settings::FileSettings;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let mut config = UpdaterConfig::new("my-app", env!("CARGO_PKG_VERSION"));
//! config.server_url = Some("https://updates.example.com/my-app/linux".to_string());
//!
//! let settings = Arc::new(FileSettings::open(FileSettings::default_path()?)?);
//! let mut engine = UpdateEngine::new(config, settings)?;
//!
//! engine.check_for_update().await;
//! if engine.update_available() {
//!     println!("{} is available", engine.latest_version());
//! }
//! # Ok(())
//! # }
//! ```

pub mod appcast;
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod downloader;
pub mod engine;
pub mod launcher;
pub mod settings;
pub mod utils;

// test_utils is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
