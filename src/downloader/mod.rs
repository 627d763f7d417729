//! Cancellable HTTP downloads to disk or memory
//!
//! The [`Downloader`] runs at most one transfer at a time. A transfer streams
//! the response body chunk by chunk, reports a 0-100 percentage through an
//! optional callback, and ends with exactly one outcome: the final file (or
//! buffer), a [`DownloadError`], or [`DownloadError::Cancelled`] when
//! [`Downloader::cancel`] won the race against the network.
//!
//! # File downloads
//!
//! Bytes are written to `<dir>/<name>.part` and renamed to `<dir>/<name>`
//! only once the body is complete. Every failure path removes the partial
//! file, so an interrupted download never leaves a file that looks finished.
//! The file name is the last segment of the URL path.
//!
//! # Example
//!
//! ```rust,no_run
//! use appcast_updater::downloader::Downloader;
//! use std::path::Path;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), appcast_updater::core::DownloadError> {
//! let downloader = Downloader::new();
//! let progress = Arc::new(|percent: u8| println!("{percent}%"));
//!
//! let path = downloader
//!     .fetch_file(
//!         "https://example.com/app/installer-2.0.exe",
//!         Path::new("/tmp/app/Update"),
//!         Duration::from_secs(30),
//!         Some(progress),
//!     )
//!     .await?;
//! println!("saved to {}", path.display());
//! # Ok(())
//! # }
//! ```

pub mod checksum;

pub use checksum::{ChecksumAlgorithm, InvalidChecksumBehavior, compute_checksum, verify_checksum};

use crate::constants::{MIN_PROGRESS_TOTAL_BYTES, PARTIAL_FILE_EXTENSION, USER_AGENT};
use crate::core::DownloadError;
use futures::StreamExt;
use reqwest::Url;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Receives download progress as a percentage in `0..=100`.
pub type ProgressFn = Arc<dyn Fn(u8) + Send + Sync>;

type ActiveSlot = Arc<Mutex<Option<CancellationToken>>>;

fn lock_slot(slot: &ActiveSlot) -> MutexGuard<'_, Option<CancellationToken>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Single-transfer HTTP downloader.
///
/// Cloning is cheap and clones share the same transfer slot, so a clone can
/// cancel or observe a transfer started through another.
#[derive(Clone)]
pub struct Downloader {
    client: reqwest::Client,
    active: ActiveSlot,
}

impl Default for Downloader {
    fn default() -> Self {
        Self::new()
    }
}

impl Downloader {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to build HTTP client, using defaults: {}", e);
                reqwest::Client::new()
            });
        Self::with_client(client)
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            active: Arc::new(Mutex::new(None)),
        }
    }

    /// Whether a transfer is currently running.
    pub fn is_downloading(&self) -> bool {
        lock_slot(&self.active).is_some()
    }

    /// Abort the in-flight transfer. A no-op when idle.
    pub fn cancel(&self) {
        self.canceller().cancel();
    }

    /// A handle able to cancel transfers of this downloader from any task.
    pub fn canceller(&self) -> Canceller {
        Canceller {
            active: Arc::clone(&self.active),
        }
    }

    /// Download `url` into `dest_dir`, returning the final file path.
    pub async fn fetch_file(
        &self,
        url: &str,
        dest_dir: &Path,
        timeout: Duration,
        progress: Option<ProgressFn>,
    ) -> Result<PathBuf, DownloadError> {
        let transfer = self.begin()?;
        self.fetch_file_with(&transfer, url, dest_dir, timeout, progress).await
    }

    /// Download `url` into memory.
    pub async fn fetch_data(
        &self,
        url: &str,
        timeout: Duration,
        progress: Option<ProgressFn>,
    ) -> Result<Vec<u8>, DownloadError> {
        let transfer = self.begin()?;
        self.fetch_data_with(&transfer, url, timeout, progress).await
    }

    /// Reserve the transfer slot.
    ///
    /// Splitting reservation from the transfer lets a caller publish "busy"
    /// state after the slot is taken, so a cancel issued in between is not lost.
    pub(crate) fn begin(&self) -> Result<ActiveTransfer, DownloadError> {
        let mut slot = lock_slot(&self.active);
        if slot.is_some() {
            return Err(DownloadError::AlreadyDownloading);
        }

        let token = CancellationToken::new();
        *slot = Some(token.clone());
        Ok(ActiveTransfer {
            slot: Arc::clone(&self.active),
            token,
        })
    }

    pub(crate) async fn fetch_file_with(
        &self,
        transfer: &ActiveTransfer,
        url: &str,
        dest_dir: &Path,
        timeout: Duration,
        progress: Option<ProgressFn>,
    ) -> Result<PathBuf, DownloadError> {
        let url = parse_url(url)?;
        let file_name = file_name_of(&url).ok_or_else(|| {
            warn!("URL does not name a file: {}", url);
            DownloadError::UrlInvalid
        })?;

        prepare_dir(dest_dir).await?;

        let final_path = dest_dir.join(&file_name);
        let partial_path = dest_dir.join(format!("{file_name}.{PARTIAL_FILE_EXTENSION}"));

        remove_if_exists(&final_path).await?;
        remove_if_exists(&partial_path).await?;

        let file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&partial_path)
            .await
            .map_err(|e| {
                warn!("Cannot create {}: {}", partial_path.display(), e);
                DownloadError::NotAllowedToWriteFile
            })?;
        let mut guard = PartialFile::new(partial_path.clone());

        info!("Downloading {} to {}", url, final_path.display());
        let request = DownloadRequest {
            url,
            timeout,
            progress,
        };
        let mut sink = Sink::File(file);
        self.transfer(transfer, request, &mut sink).await?;
        sink.finish().await?;
        drop(sink);

        if !fs::try_exists(&partial_path).await.unwrap_or(false) {
            return Err(DownloadError::FileCorruptedOrMissing);
        }

        fs::rename(&partial_path, &final_path).await.map_err(|e| {
            warn!("Cannot rename {} to {}: {}", partial_path.display(), final_path.display(), e);
            DownloadError::CannotRenameFile
        })?;
        guard.commit();

        info!("Downloaded {}", final_path.display());
        Ok(final_path)
    }

    pub(crate) async fn fetch_data_with(
        &self,
        transfer: &ActiveTransfer,
        url: &str,
        timeout: Duration,
        progress: Option<ProgressFn>,
    ) -> Result<Vec<u8>, DownloadError> {
        let url = parse_url(url)?;
        debug!("Fetching {}", url);

        let request = DownloadRequest {
            url,
            timeout,
            progress,
        };
        let mut data = Vec::new();
        self.transfer(transfer, request, &mut Sink::Memory(&mut data)).await?;
        Ok(data)
    }

    async fn transfer(
        &self,
        transfer: &ActiveTransfer,
        request: DownloadRequest,
        sink: &mut Sink<'_>,
    ) -> Result<(), DownloadError> {
        let token = &transfer.token;
        let send = self.client.get(request.url.clone()).timeout(request.timeout).send();

        let response = tokio::select! {
            biased;
            () = token.cancelled() => {
                info!("Download of {} cancelled", request.url);
                return Err(DownloadError::Cancelled);
            }
            response = send => response.map_err(|e| {
                warn!("Request to {} failed: {}", request.url, e);
                DownloadError::NetworkError
            })?,
        };

        let response = response.error_for_status().map_err(|e| {
            warn!("Server rejected {}: {}", request.url, e);
            DownloadError::NetworkError
        })?;

        let mut tracker = ProgressTracker::new(response.content_length(), request.progress);
        tracker.report(0);

        let mut stream = response.bytes_stream();
        loop {
            let next = tokio::select! {
                biased;
                () = token.cancelled() => {
                    info!("Download of {} cancelled", request.url);
                    return Err(DownloadError::Cancelled);
                }
                next = stream.next() => next,
            };

            match next {
                Some(Ok(chunk)) => {
                    sink.write(&chunk).await?;
                    tracker.advance(chunk.len() as u64);
                }
                Some(Err(e)) => {
                    warn!("Transfer of {} failed: {}", request.url, e);
                    return Err(DownloadError::NetworkError);
                }
                None => break,
            }
        }

        tracker.report(100);
        Ok(())
    }
}

/// Cancels the active transfer of the [`Downloader`] it came from.
#[derive(Clone)]
pub struct Canceller {
    active: ActiveSlot,
}

impl Canceller {
    pub fn cancel(&self) {
        self.cancel_if(|| true);
    }

    /// Cancel the active transfer only if `still_wanted` holds.
    ///
    /// The predicate runs with the transfer slot locked, so no transfer can
    /// start or end between the decision and the cancellation. Returns whether
    /// a transfer was cancelled.
    pub fn cancel_if(&self, still_wanted: impl FnOnce() -> bool) -> bool {
        let slot = lock_slot(&self.active);
        match slot.as_ref() {
            Some(token) if still_wanted() => {
                debug!("Cancelling active download");
                token.cancel();
                true
            }
            _ => false,
        }
    }
}

/// Reservation of the downloader's transfer slot; released on drop.
pub(crate) struct ActiveTransfer {
    slot: ActiveSlot,
    token: CancellationToken,
}

impl ActiveTransfer {
    pub(crate) fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for ActiveTransfer {
    fn drop(&mut self) {
        lock_slot(&self.slot).take();
    }
}

struct DownloadRequest {
    url: Url,
    timeout: Duration,
    progress: Option<ProgressFn>,
}

enum Sink<'a> {
    File(fs::File),
    Memory(&'a mut Vec<u8>),
}

impl Sink<'_> {
    async fn write(&mut self, chunk: &[u8]) -> Result<(), DownloadError> {
        match self {
            Self::File(file) => file.write_all(chunk).await.map_err(|e| {
                warn!("Failed to write downloaded data: {}", e);
                DownloadError::NotAllowedToWriteFile
            }),
            Self::Memory(buffer) => {
                buffer.extend_from_slice(chunk);
                Ok(())
            }
        }
    }

    async fn finish(&mut self) -> Result<(), DownloadError> {
        if let Self::File(file) = self {
            file.flush().await.map_err(|_| DownloadError::NotAllowedToWriteFile)?;
            file.sync_all().await.map_err(|_| DownloadError::NotAllowedToWriteFile)?;
        }
        Ok(())
    }
}

/// Removes the partial file on drop unless the download was committed.
struct PartialFile {
    path: PathBuf,
    committed: bool,
}

impl PartialFile {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            committed: false,
        }
    }

    fn commit(&mut self) {
        self.committed = true;
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if !self.committed && self.path.exists() {
            if let Err(e) = std::fs::remove_file(&self.path) {
                warn!("Failed to remove partial file {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Turns received byte counts into deduplicated percentages.
struct ProgressTracker {
    total: Option<u64>,
    received: u64,
    last: Option<u8>,
    callback: Option<ProgressFn>,
}

impl ProgressTracker {
    fn new(total: Option<u64>, callback: Option<ProgressFn>) -> Self {
        // Small or unknown bodies report nothing
        let total = total.filter(|t| *t >= MIN_PROGRESS_TOTAL_BYTES);
        Self {
            total,
            received: 0,
            last: None,
            callback,
        }
    }

    fn advance(&mut self, bytes: u64) {
        self.received += bytes;
        if let Some(total) = self.total {
            let percent = ((self.received as f64 / total as f64) * 100.0).round().min(100.0) as u8;
            self.report(percent);
        }
    }

    fn report(&mut self, percent: u8) {
        if self.total.is_none() || self.last == Some(percent) {
            return;
        }
        self.last = Some(percent);
        if let Some(callback) = &self.callback {
            callback(percent);
        }
    }
}

fn parse_url(url: &str) -> Result<Url, DownloadError> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(DownloadError::UrlInvalid);
    }

    let parsed = Url::parse(trimmed).map_err(|e| {
        warn!("Invalid URL '{}': {}", trimmed, e);
        DownloadError::UrlInvalid
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => {
            warn!("Unsupported URL scheme '{}' in {}", scheme, trimmed);
            Err(DownloadError::UrlInvalid)
        }
    }
}

/// Last non-empty path segment of `url`.
pub(crate) fn file_name_of(url: &Url) -> Option<String> {
    url.path_segments()?
        .next_back()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}

async fn prepare_dir(dir: &Path) -> Result<(), DownloadError> {
    if dir.as_os_str().is_empty() {
        return Err(DownloadError::LocalDirInvalid);
    }

    match fs::metadata(dir).await {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => {
            warn!("Download destination is not a directory: {}", dir.display());
            Err(DownloadError::LocalDirInvalid)
        }
        Err(_) => fs::create_dir_all(dir).await.map_err(|e| {
            warn!("Cannot create {}: {}", dir.display(), e);
            DownloadError::CannotCreateLocalDir
        }),
    }
}

async fn remove_if_exists(path: &Path) -> Result<(), DownloadError> {
    match fs::remove_file(path).await {
        Ok(()) => {
            debug!("Removed previous file {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => {
            warn!("Cannot remove {}: {}", path.display(), e);
            Err(DownloadError::CannotRemoveFile)
        }
    }
}
