//! Error handling for the updater
//!
//! The error system follows two principles:
//! 1. **Strongly-typed errors** for precise handling inside the library
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Error Types
//!
//! - [`DownloadError`] - terminal outcome kinds of a single transfer
//! - [`UpdateError`] - the coarse taxonomy the update engine reports in its events
//! - [`ManifestError`] - appcast parsing, validation and persistence failures
//! - [`ErrorContext`] - wrapper adding suggestions and details for display
//!
//! Downloader kinds collapse into engine kinds through `From<DownloadError>`:
//!
//! ```rust
//! use appcast_updater::core::{DownloadError, UpdateError};
//!
//! assert_eq!(UpdateError::from(DownloadError::UrlInvalid), UpdateError::Url);
//! assert_eq!(UpdateError::from(DownloadError::CannotRenameFile), UpdateError::Disk);
//! assert_eq!(UpdateError::from(DownloadError::NetworkError), UpdateError::Network);
//! ```

use colored::Colorize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Why a transfer did not produce a file or a buffer.
///
/// Success is represented by `Ok`, so every variant here is a failure kind.
/// Variants carry no payload; the downloader logs the underlying cause
/// before returning one.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DownloadError {
    /// Another transfer is already active on the same downloader
    #[error("a download is already in progress")]
    AlreadyDownloading,

    /// URL is empty, unparsable, not http(s), or names no file
    #[error("the URL is invalid")]
    UrlInvalid,

    /// Destination directory is empty or not a directory
    #[error("the local directory is invalid")]
    LocalDirInvalid,

    #[error("the local directory cannot be created")]
    CannotCreateLocalDir,

    /// A previous file or partial file could not be removed
    #[error("an existing file cannot be removed")]
    CannotRemoveFile,

    #[error("not allowed to write the file")]
    NotAllowedToWriteFile,

    /// Connection failure, timeout, or an HTTP error status
    #[error("network error")]
    NetworkError,

    /// The partial file vanished or was unreadable after the transfer
    #[error("the downloaded file is corrupted or missing")]
    FileCorruptedOrMissing,

    #[error("the downloaded file is missing its partial suffix")]
    FileMissingExpectedSuffix,

    #[error("the downloaded file cannot be renamed")]
    CannotRenameFile,

    #[error("the download was cancelled")]
    Cancelled,
}

/// Error taxonomy reported by the update engine.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateError {
    #[error("invalid URL")]
    Url,

    #[error("network error")]
    Network,

    #[error("disk error")]
    Disk,

    #[error("checksum mismatch")]
    Checksum,

    #[error("the installer could not be executed")]
    InstallerExecution,

    #[error("unknown error")]
    Unknown,
}

impl From<DownloadError> for UpdateError {
    fn from(error: DownloadError) -> Self {
        match error {
            DownloadError::UrlInvalid => Self::Url,
            DownloadError::LocalDirInvalid
            | DownloadError::CannotCreateLocalDir
            | DownloadError::CannotRemoveFile
            | DownloadError::NotAllowedToWriteFile
            | DownloadError::FileCorruptedOrMissing
            | DownloadError::FileMissingExpectedSuffix
            | DownloadError::CannotRenameFile => Self::Disk,
            DownloadError::NetworkError => Self::Network,
            DownloadError::AlreadyDownloading | DownloadError::Cancelled => Self::Unknown,
        }
    }
}

/// Failures while reading, validating or saving an appcast document.
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("malformed appcast document: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("appcast has no version")]
    MissingVersion,

    #[error("invalid appcast version '{0}'")]
    InvalidVersion(String),

    #[error("invalid appcast date '{0}' (expected dd/mm/yyyy)")]
    InvalidDate(String),

    #[error("invalid {field} '{url}'")]
    InvalidUrl {
        field: &'static str,
        url: String,
    },

    #[error("checksum '{checksum}' is not a valid {algorithm} digest")]
    InvalidChecksum {
        checksum: String,
        algorithm: String,
    },

    #[error("failed to read appcast {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to save appcast to {}: {reason}", path.display())]
    Write {
        path: PathBuf,
        reason: String,
    },
}

/// Error wrapper with an optional suggestion and details for terminal display.
#[derive(Debug)]
pub struct ErrorContext {
    pub message: String,
    pub suggestion: Option<String>,
    pub details: Option<String>,
}

impl ErrorContext {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
            details: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr with colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.message);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

/// Convert any error into an [`ErrorContext`] with a suggestion where one is known.
///
/// The full `anyhow` chain becomes the message, so context added with
/// `.context(..)` is preserved.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let message = format!("{error:#}");

    if let Some(update_error) = error.downcast_ref::<UpdateError>() {
        return match update_error {
            UpdateError::Url => ErrorContext::new(message)
                .with_suggestion("Check the server URL in the configuration or pass --server-url"),
            UpdateError::Network => ErrorContext::new(message)
                .with_suggestion("Check your network connection and that the update server is reachable")
                .with_details("Timeouts and HTTP error statuses are reported as network errors"),
            UpdateError::Disk => ErrorContext::new(message)
                .with_suggestion("Check permissions and free space of the working directory"),
            UpdateError::Checksum => ErrorContext::new(message)
                .with_suggestion("Download the installer again with `appcast download installer`")
                .with_details("The installer on disk does not match the checksum published in the appcast"),
            UpdateError::InstallerExecution => ErrorContext::new(message)
                .with_suggestion("Run the downloaded installer manually from the working directory"),
            UpdateError::Unknown => ErrorContext::new(message),
        };
    }

    if let Some(manifest_error) = error.downcast_ref::<ManifestError>() {
        return ErrorContext::new(message)
            .with_details(manifest_error.to_string())
            .with_suggestion("Verify the appcast published by the update server");
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(message)
                    .with_suggestion("Check file ownership and permissions");
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(message)
                    .with_suggestion("Check that the file or directory exists and the path is correct");
            }
            _ => {}
        }
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(message)
            .with_details(toml_error.message().to_string())
            .with_suggestion("Check the TOML syntax of the configuration file");
    }

    ErrorContext::new(message)
}
