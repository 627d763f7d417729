//! Core types shared by every part of the updater
//!
//! # Error Management
//!
//! The updater separates errors by layer:
//! - [`DownloadError`] - the kind of failure a single transfer ended with
//! - [`UpdateError`] - the coarse kind reported in engine events
//! - [`ManifestError`] - appcast parsing, validation and persistence
//! - [`ErrorContext`] / [`user_friendly_error`] - terminal presentation for the CLI
//!
//! Library operations return these typed errors; CLI glue wraps them in
//! `anyhow` with context and converts the result with [`user_friendly_error`]
//! at the top level.

pub mod error;

pub use error::{DownloadError, ErrorContext, ManifestError, UpdateError, user_friendly_error};
