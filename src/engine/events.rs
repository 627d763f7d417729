//! Change notifications emitted by the update engine.
//!
//! Every subscriber receives every event, in emission order. Channels are
//! unbounded so a slow consumer never causes events to be dropped; a
//! subscriber that goes away is pruned on the next emission.

use super::state::{CheckFrequency, EngineState, InstallMode, UpdateAvailability};
use crate::core::UpdateError;
use chrono::{DateTime, NaiveDate, Utc};
use semver::Version;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateEvent {
    StateChanged(EngineState),
    ServerUrlChanged(String),
    FrequencyChanged(CheckFrequency),
    LastCheckTimeChanged(Option<DateTime<Utc>>),
    WorkingDirChanged(PathBuf),
    CheckTimeoutChanged(Duration),
    InstallModeChanged(InstallMode),
    InstallerDestinationDirChanged(Option<PathBuf>),

    CheckForUpdateForced,
    CheckStarted,
    CheckProgress(u8),
    CheckFinished,
    /// The appcast could not be fetched; local resumption is still attempted
    CheckOnlineFailed,
    CheckFailed(UpdateError),
    CheckCancelled,

    UpdateAvailabilityChanged(UpdateAvailability),
    LatestVersionChanged(Version),
    LatestVersionDateChanged(NaiveDate),

    ChangelogDownloadStarted,
    ChangelogDownloadProgress(u8),
    ChangelogDownloadFinished,
    ChangelogDownloadFailed(UpdateError),
    ChangelogDownloadCancelled,
    ChangelogAvailableChanged(bool),
    LatestChangelogChanged,

    InstallerDownloadStarted,
    InstallerDownloadProgress(u8),
    InstallerDownloadFinished,
    InstallerDownloadFailed(UpdateError),
    InstallerDownloadCancelled,
    InstallerAvailableChanged(bool),

    InstallationStarted,
    InstallationFailed(UpdateError),
    InstallationFinished,
    /// The installer was launched and the host application should exit
    QuitRequested,
}

/// Fan-out of [`UpdateEvent`]s to any number of subscribers.
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<UpdateEvent>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<UpdateEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner).push(tx);
        rx
    }

    pub fn emit(&self, event: UpdateEvent) {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Downloader progress callback that runs `on_progress` then emits `make(percent)`.
    pub(crate) fn progress_emitter(
        &self,
        make: fn(u8) -> UpdateEvent,
        on_progress: impl Fn(u8) + Send + Sync + 'static,
    ) -> crate::downloader::ProgressFn {
        let bus = self.clone();
        Arc::new(move |percent| {
            on_progress(percent);
            bus.emit(make(percent));
        })
    }
}
