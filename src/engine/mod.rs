//! The update engine
//!
//! [`UpdateEngine`] drives the whole update lifecycle for one application:
//!
//! ```text
//! Idle --check (gated by frequency)--> CheckingForUpdate --> Idle
//! Idle --download_changelog--> DownloadingChangelog --> Idle
//! Idle --download_installer--> DownloadingInstaller --> Idle
//! Idle --install_update--> InstallingUpdate --> Idle
//! ```
//!
//! Operations take `&mut self` and are only accepted while the engine is
//! [`EngineState::Idle`]; anything else is ignored rather than queued.
//! Outcomes are reported as [`UpdateEvent`]s to every subscriber, and the
//! current values are available through accessors.
//!
//! # Online and local records
//!
//! A successful check produces an *online* record from the fetched appcast.
//! The appcast is saved into the working directory so that a later run can
//! recover a *local* record when the server is unreachable, provided the
//! installer and changelog downloaded for it are still present. Online always
//! wins over local.
//!
//! # Cancellation
//!
//! While an operation holds the engine, a [`CancelHandle`] obtained from
//! [`UpdateEngine::cancel_handle`] can stop the running download from any
//! task. Cancellation is ignored while idle or installing.
//!
//! # Example
//!
//! ```rust,no_run
//! use appcast_updater::config::UpdaterConfig;
//! use appcast_updater::engine::{UpdateEngine, UpdateEvent};
//! use appcast_updater::settings::MemorySettings;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let mut config = UpdaterConfig::new("my-app", "1.0.0");
//! config.server_url = Some("https://updates.example.com/my-app/linux".to_string());
//!
//! let mut engine = UpdateEngine::new(config, Arc::new(MemorySettings::new()))?;
//! let mut events = engine.subscribe();
//!
//! engine.force_check_for_update().await;
//! while let Ok(event) = events.try_recv() {
//!     println!("{event:?}");
//! }
//! if engine.update_available() {
//!     engine.download_installer().await;
//!     engine.install_update(false).await;
//! }
//! # Ok(())
//! # }
//! ```

mod events;
mod state;

pub use events::{EventBus, UpdateEvent};
pub use state::{CheckFrequency, EngineState, InstallMode, UpdateAvailability};

use crate::appcast::version::is_newer;
use crate::appcast::{AppcastManifest, UpdateRecord};
use crate::config::UpdaterConfig;
use crate::constants::SCHEDULED_CHECK_INTERVAL;
use crate::core::{DownloadError, UpdateError};
use crate::downloader::{Canceller, Downloader, InvalidChecksumBehavior, verify_checksum};
use crate::launcher::{InstallerLauncher, SystemLauncher};
use crate::settings::{CHECK_FREQUENCY_KEY, LAST_CHECK_TIME_KEY, LAST_MANIFEST_KEY, SettingsStore};
use crate::utils::fs::clear_directory_content;
use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use semver::Version;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Cancels the engine's running operation from another task.
#[derive(Clone)]
pub struct CancelHandle {
    state: watch::Receiver<EngineState>,
    canceller: Canceller,
}

impl CancelHandle {
    /// Cancel the running check or download.
    ///
    /// Returns `false` when the engine is idle or installing, or when the
    /// operation seen running has already finished; nothing is cancelled then.
    /// A cancel aimed at a check never reaches the changelog download that
    /// follows it.
    pub fn cancel(&self) -> bool {
        let observed = *self.state.borrow();
        if !observed.is_cancellable() {
            debug!("Ignoring cancel while {}", observed);
            return false;
        }

        // A cancellable state is only published while its operation holds the
        // slot or after it released it, so an unchanged state under the slot
        // lock means any reserved slot belongs to the observed operation.
        let cancelled = self.canceller.cancel_if(|| *self.state.borrow() == observed);
        if cancelled {
            info!("Cancelled {}", observed);
        } else {
            debug!("Ignoring cancel, {} already finished", observed);
        }
        cancelled
    }

    pub fn state(&self) -> EngineState {
        *self.state.borrow()
    }
}

pub struct UpdateEngine {
    current_version: Version,
    current_version_date: Option<NaiveDate>,
    current_changelog_path: Option<PathBuf>,
    server_url: String,
    server_url_initialized: bool,
    working_dir: PathBuf,
    check_timeout: Duration,
    install_mode: InstallMode,
    installer_destination_dir: Option<PathBuf>,
    frequency: CheckFrequency,
    last_check_time: Option<DateTime<Utc>>,
    quit_after_install_launch: bool,
    remove_installer_on_checksum_mismatch: bool,

    online: Option<UpdateRecord>,
    local: Option<UpdateRecord>,

    state: watch::Sender<EngineState>,
    events: EventBus,
    progress: Arc<AtomicU8>,
    downloader: Downloader,
    settings: Arc<dyn SettingsStore>,
    launcher: Arc<dyn InstallerLauncher>,
}

impl UpdateEngine {
    /// Build an engine from its configuration and persisted settings.
    ///
    /// The persisted check frequency wins over `config.default_frequency`.
    pub fn new(config: UpdaterConfig, settings: Arc<dyn SettingsStore>) -> Result<Self> {
        let current_version = config.parsed_current_version()?;
        let current_version_date = config.parsed_current_version_date()?;

        let frequency = settings
            .get(CHECK_FREQUENCY_KEY)
            .and_then(|raw| {
                raw.parse::<CheckFrequency>()
                    .map_err(|e| warn!("Ignoring persisted frequency: {}", e))
                    .ok()
            })
            .unwrap_or(config.default_frequency);

        let last_check_time = settings.get(LAST_CHECK_TIME_KEY).and_then(|raw| {
            DateTime::parse_from_rfc3339(&raw)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| warn!("Ignoring persisted last check time '{}': {}", raw, e))
                .ok()
        });

        let server_url = config.server_url.clone().unwrap_or_default();
        let (state, _) = watch::channel(EngineState::Idle);

        debug!(
            "Update engine for {} {} (frequency {}, last check {:?})",
            config.app_name, current_version, frequency, last_check_time
        );

        Ok(Self {
            current_version,
            current_version_date,
            current_changelog_path: config.current_changelog_path.clone(),
            server_url_initialized: !server_url.is_empty(),
            server_url,
            working_dir: config.working_dir(),
            check_timeout: config.check_timeout(),
            install_mode: config.install_mode,
            installer_destination_dir: config.installer_destination_dir.clone(),
            frequency,
            last_check_time,
            quit_after_install_launch: config.quit_after_install_launch,
            remove_installer_on_checksum_mismatch: config.remove_installer_on_checksum_mismatch,
            online: None,
            local: None,
            state,
            events: EventBus::new(),
            progress: Arc::new(AtomicU8::new(0)),
            downloader: Downloader::new(),
            settings,
            launcher: Arc::new(SystemLauncher),
        })
    }

    pub fn with_launcher(mut self, launcher: Arc<dyn InstallerLauncher>) -> Self {
        self.launcher = launcher;
        self
    }

    pub fn with_downloader(mut self, downloader: Downloader) -> Self {
        self.downloader = downloader;
        self
    }

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<UpdateEvent> {
        self.events.subscribe()
    }

    pub fn watch_state(&self) -> watch::Receiver<EngineState> {
        self.state.subscribe()
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            state: self.state.subscribe(),
            canceller: self.downloader.canceller(),
        }
    }

    /// Cancel the running operation; see [`CancelHandle::cancel`].
    pub fn cancel(&self) -> bool {
        self.cancel_handle().cancel()
    }

    // Accessors

    pub fn state(&self) -> EngineState {
        *self.state.borrow()
    }

    pub fn current_version(&self) -> &Version {
        &self.current_version
    }

    pub fn current_version_date(&self) -> Option<NaiveDate> {
        self.current_version_date
    }

    /// Changelog of the running version, empty when none is configured.
    pub fn current_changelog(&self) -> String {
        self.current_changelog_path
            .as_deref()
            .and_then(|path| std::fs::read_to_string(path).ok())
            .unwrap_or_default()
    }

    /// The record currently considered: online if known, else local.
    pub fn latest_record(&self) -> Option<&UpdateRecord> {
        self.online.as_ref().or(self.local.as_ref())
    }

    fn latest_record_mut(&mut self) -> Option<&mut UpdateRecord> {
        self.online.as_mut().or(self.local.as_mut())
    }

    pub fn update_availability(&self) -> UpdateAvailability {
        match self.latest_record() {
            None => UpdateAvailability::Unknown,
            Some(record) if is_newer(&record.manifest().version, &self.current_version) => {
                UpdateAvailability::Available
            }
            Some(_) => UpdateAvailability::UpToDate,
        }
    }

    pub fn update_available(&self) -> bool {
        self.update_availability() == UpdateAvailability::Available
    }

    /// A changelog is only offered for a version newer than the running one.
    pub fn changelog_available(&self) -> bool {
        self.update_available() && self.latest_record().is_some_and(UpdateRecord::ready_to_show_changelog)
    }

    /// An installer is only offered for a version newer than the running one.
    pub fn installer_available(&self) -> bool {
        self.update_available() && self.latest_record().is_some_and(|r| r.ready_to_install(self.install_mode))
    }

    /// Latest known version; the running version when nothing is known.
    pub fn latest_version(&self) -> &Version {
        self.latest_record().map_or(&self.current_version, |r| &r.manifest().version)
    }

    pub fn latest_version_date(&self) -> Option<NaiveDate> {
        self.latest_record().map_or(self.current_version_date, |r| Some(r.manifest().date))
    }

    pub fn latest_changelog(&self) -> &str {
        self.latest_record().map_or("", UpdateRecord::changelog_text)
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub fn frequency(&self) -> CheckFrequency {
        self.frequency
    }

    pub fn last_check_time(&self) -> Option<DateTime<Utc>> {
        self.last_check_time
    }

    pub fn check_timeout(&self) -> Duration {
        self.check_timeout
    }

    pub fn install_mode(&self) -> InstallMode {
        self.install_mode
    }

    pub fn installer_destination_dir(&self) -> Option<&Path> {
        self.installer_destination_dir.as_deref()
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Percentage of the most recent download.
    pub fn download_progress(&self) -> u8 {
        self.progress.load(Ordering::Relaxed)
    }

    // Setters

    /// Point the engine at another appcast, forgetting everything known.
    pub fn set_server_url(&mut self, url: impl Into<String>) {
        let url = url.into();
        if url == self.server_url {
            return;
        }

        self.server_url = url;
        self.events.emit(UpdateEvent::ServerUrlChanged(self.server_url.clone()));
        self.online = None;
        self.local = None;

        if self.server_url_initialized {
            self.last_check_time = None;
            self.forget_setting(LAST_CHECK_TIME_KEY);
            self.events.emit(UpdateEvent::LastCheckTimeChanged(None));
            self.events.emit(UpdateEvent::UpdateAvailabilityChanged(self.update_availability()));
            self.events.emit(UpdateEvent::InstallerAvailableChanged(false));
        } else {
            self.server_url_initialized = true;
        }
    }

    pub fn set_frequency(&mut self, frequency: CheckFrequency) {
        if frequency == self.frequency {
            return;
        }
        self.frequency = frequency;
        self.store_setting(CHECK_FREQUENCY_KEY, frequency.as_str());
        self.events.emit(UpdateEvent::FrequencyChanged(frequency));
    }

    pub fn set_working_dir(&mut self, dir: impl Into<PathBuf>) {
        let dir = dir.into();
        if dir == self.working_dir {
            return;
        }
        self.working_dir = dir;
        self.events.emit(UpdateEvent::WorkingDirChanged(self.working_dir.clone()));
    }

    pub fn set_check_timeout(&mut self, timeout: Duration) {
        if timeout == self.check_timeout {
            return;
        }
        self.check_timeout = timeout;
        self.events.emit(UpdateEvent::CheckTimeoutChanged(timeout));
    }

    pub fn set_install_mode(&mut self, mode: InstallMode) {
        if mode == self.install_mode {
            return;
        }
        self.install_mode = mode;
        self.events.emit(UpdateEvent::InstallModeChanged(mode));
    }

    pub fn set_installer_destination_dir(&mut self, dir: Option<PathBuf>) {
        if dir == self.installer_destination_dir {
            return;
        }
        self.installer_destination_dir = dir;
        self.events
            .emit(UpdateEvent::InstallerDestinationDirChanged(self.installer_destination_dir.clone()));
    }

    // Operations

    /// Passive check: only reaches the server when the frequency says so.
    pub async fn check_for_update(&mut self) {
        if self.state() != EngineState::Idle || self.server_url.is_empty() {
            return;
        }

        if !self.frequency.is_due(self.last_check_time, Utc::now()) {
            debug!("Skipping update check (frequency {}, last check {:?})", self.frequency, self.last_check_time);
            return;
        }

        self.force_check_for_update().await;
    }

    /// Check the server now, regardless of the frequency.
    ///
    /// When a newer version is found, its changelog download starts right away.
    pub async fn force_check_for_update(&mut self) {
        self.events.emit(UpdateEvent::CheckForUpdateForced);

        if self.state() != EngineState::Idle || self.server_url.is_empty() {
            return;
        }

        let transfer = match self.downloader.begin() {
            Ok(transfer) => transfer,
            Err(e) => {
                warn!("Cannot start update check: {}", e);
                self.events.emit(UpdateEvent::CheckFailed(e.into()));
                return;
            }
        };

        self.online = None;
        self.local = None;

        let now = Utc::now();
        self.last_check_time = Some(now);
        self.store_setting(LAST_CHECK_TIME_KEY, &now.to_rfc3339());
        self.events.emit(UpdateEvent::LastCheckTimeChanged(Some(now)));

        self.set_state(EngineState::CheckingForUpdate);
        self.events.emit(UpdateEvent::CheckStarted);
        info!("Checking for updates at {}", self.server_url);

        let progress = self.progress_callback(UpdateEvent::CheckProgress);
        let url = self.server_url.clone();
        let result = self
            .downloader
            .fetch_data_with(&transfer, &url, self.check_timeout, Some(progress))
            .await;
        drop(transfer);

        self.finish_check(result).await;

        let auto_download = self.update_available()
            && self
                .online
                .as_ref()
                .is_some_and(|record| record.manifest().changelog_url.is_some());
        if auto_download {
            self.download_changelog().await;
        }
    }

    async fn finish_check(&mut self, result: Result<Vec<u8>, DownloadError>) {
        let changelog_before = self.changelog_available();
        let installer_before = self.installer_available();

        let online_error = match result {
            Err(DownloadError::Cancelled) => {
                self.online = None;
                self.local = None;
                self.events.emit(UpdateEvent::CheckCancelled);
                self.notify_check_done(false, changelog_before, installer_before);
                return;
            }
            Err(e) => {
                warn!("Update check failed: {}", e);
                self.events.emit(UpdateEvent::CheckOnlineFailed);
                Some(UpdateError::from(e))
            }
            Ok(bytes) => match AppcastManifest::from_slice(&bytes) {
                Ok(manifest) => {
                    debug!("Server announces version {}", manifest.version);
                    self.online = Some(UpdateRecord::new(manifest));
                    None
                }
                Err(e) => {
                    warn!("Server returned an invalid appcast: {}", e);
                    Some(UpdateError::Unknown)
                }
            },
        };

        self.local = self.check_for_local_update().await;

        if let Some(online) = &self.online {
            if let Err(e) = clear_directory_content(&self.working_dir) {
                warn!("Failed to clear {}: {:#}", self.working_dir.display(), e);
            }
            self.local = None;

            match online.manifest().save_to_file(&self.working_dir) {
                Ok(path) => self.store_setting(LAST_MANIFEST_KEY, &path.to_string_lossy()),
                Err(e) => {
                    warn!("{}", e);
                    self.online = None;
                    self.events.emit(UpdateEvent::CheckFailed(UpdateError::Disk));
                    self.notify_check_done(false, changelog_before, installer_before);
                    return;
                }
            }
        } else if self.local.is_none() {
            self.events
                .emit(UpdateEvent::CheckFailed(online_error.unwrap_or(UpdateError::Unknown)));
            self.notify_check_done(false, changelog_before, installer_before);
            return;
        } else {
            info!("Resuming previously downloaded update");
        }

        let available = self.update_available();
        info!("Current: {} - Latest: {}", self.current_version, self.latest_version());
        self.notify_check_done(available, changelog_before, installer_before);
    }

    fn notify_check_done(&mut self, available: bool, changelog_before: bool, installer_before: bool) {
        self.set_state(EngineState::Idle);
        self.events.emit(UpdateEvent::CheckFinished);

        if available {
            self.events.emit(UpdateEvent::LatestVersionChanged(self.latest_version().clone()));
            if let Some(date) = self.latest_version_date() {
                self.events.emit(UpdateEvent::LatestVersionDateChanged(date));
            }
        }
        self.events.emit(UpdateEvent::UpdateAvailabilityChanged(self.update_availability()));

        let changelog_now = self.changelog_available();
        if changelog_now != changelog_before {
            self.events.emit(UpdateEvent::ChangelogAvailableChanged(changelog_now));
        }
        let installer_now = self.installer_available();
        if installer_now != installer_before {
            self.events.emit(UpdateEvent::InstallerAvailableChanged(installer_now));
        }
    }

    /// Recover the bundle saved by a previous run.
    ///
    /// A valid appcast whose installer or changelog is missing purges the
    /// working directory.
    async fn check_for_local_update(&self) -> Option<UpdateRecord> {
        let path = self.settings.get(LAST_MANIFEST_KEY).filter(|p| !p.is_empty()).map(PathBuf::from)?;
        if !path.is_file() {
            return None;
        }

        debug!("Found previously downloaded appcast {}", path.display());
        let manifest = match AppcastManifest::from_file(&path).await {
            Ok(manifest) => manifest,
            Err(e) => {
                debug!("Previously downloaded appcast is invalid: {}", e);
                return None;
            }
        };

        let installer = manifest.installer_file_name().map(|name| self.working_dir.join(name));
        let changelog = manifest.changelog_file_name().map(|name| self.working_dir.join(name));

        match (installer, changelog) {
            (Some(installer), Some(changelog)) if installer.is_file() && changelog.is_file() => {
                Some(UpdateRecord::with_artifacts(manifest, installer, changelog))
            }
            _ => {
                debug!("Local update bundle is incomplete, purging {}", self.working_dir.display());
                if let Err(e) = clear_directory_content(&self.working_dir) {
                    warn!("Failed to clear {}: {:#}", self.working_dir.display(), e);
                }
                None
            }
        }
    }

    /// Download the changelog of the online record.
    ///
    /// Without an online record, a ready local changelog is re-announced.
    pub async fn download_changelog(&mut self) {
        if self.state() != EngineState::Idle {
            return;
        }

        let Some(online) = &self.online else {
            if self.changelog_available() {
                self.events.emit(UpdateEvent::ChangelogAvailableChanged(true));
            }
            return;
        };
        let url = online.manifest().changelog_url.clone();

        let transfer = match self.downloader.begin() {
            Ok(transfer) => transfer,
            Err(e) => {
                self.events.emit(UpdateEvent::ChangelogDownloadFailed(e.into()));
                return;
            }
        };

        self.set_state(EngineState::DownloadingChangelog);
        self.events.emit(UpdateEvent::ChangelogDownloadStarted);

        let Some(url) = url else {
            self.set_state(EngineState::Idle);
            self.events.emit(UpdateEvent::ChangelogDownloadFailed(UpdateError::Url));
            return;
        };

        info!("Downloading changelog from {}", url);
        let progress = self.progress_callback(UpdateEvent::ChangelogDownloadProgress);
        let result = self
            .downloader
            .fetch_file_with(&transfer, url.as_str(), &self.working_dir, self.check_timeout, Some(progress))
            .await;
        drop(transfer);

        match result {
            Ok(path) => {
                if let Some(online) = self.online.as_mut() {
                    online.set_changelog(Some(path));
                }
                self.set_state(EngineState::Idle);
                self.events.emit(UpdateEvent::ChangelogDownloadFinished);
                self.events.emit(UpdateEvent::ChangelogAvailableChanged(self.changelog_available()));
                self.events.emit(UpdateEvent::LatestChangelogChanged);
            }
            Err(DownloadError::Cancelled) => {
                self.set_state(EngineState::Idle);
                self.events.emit(UpdateEvent::ChangelogDownloadCancelled);
            }
            Err(e) => {
                self.set_state(EngineState::Idle);
                self.events.emit(UpdateEvent::ChangelogDownloadFailed(e.into()));
            }
        }
    }

    /// Download and verify the installer of the online record.
    ///
    /// Without an online record, a ready local installer is re-announced.
    /// An installer failing verification is deleted.
    pub async fn download_installer(&mut self) {
        if self.state() != EngineState::Idle {
            return;
        }

        let Some(online) = &self.online else {
            if self.installer_available() {
                self.events.emit(UpdateEvent::InstallerAvailableChanged(true));
            }
            return;
        };
        let manifest = online.manifest().clone();

        let transfer = match self.downloader.begin() {
            Ok(transfer) => transfer,
            Err(e) => {
                self.events.emit(UpdateEvent::InstallerDownloadFailed(e.into()));
                return;
            }
        };

        self.set_state(EngineState::DownloadingInstaller);
        self.events.emit(UpdateEvent::InstallerDownloadStarted);

        let Some(url) = manifest.installer_url.as_ref() else {
            self.set_state(EngineState::Idle);
            self.events.emit(UpdateEvent::InstallerDownloadFailed(UpdateError::Url));
            return;
        };

        info!("Downloading installer from {}", url);
        let progress = self.progress_callback(UpdateEvent::InstallerDownloadProgress);
        let result = self
            .downloader
            .fetch_file_with(&transfer, url.as_str(), &self.working_dir, self.check_timeout, Some(progress))
            .await;
        drop(transfer);

        let path = match result {
            Ok(path) => path,
            Err(DownloadError::Cancelled) => {
                self.set_state(EngineState::Idle);
                self.events.emit(UpdateEvent::InstallerDownloadCancelled);
                return;
            }
            Err(e) => {
                self.set_state(EngineState::Idle);
                self.events.emit(UpdateEvent::InstallerDownloadFailed(e.into()));
                return;
            }
        };

        let valid = verify_checksum(
            &path,
            &manifest.checksum,
            manifest.checksum_algorithm,
            InvalidChecksumBehavior::RemoveFile,
        )
        .await;
        self.set_state(EngineState::Idle);

        if !valid {
            self.events.emit(UpdateEvent::InstallerDownloadFailed(UpdateError::Checksum));
            return;
        }

        if let Some(online) = self.online.as_mut() {
            online.set_installer(Some(path));
        }
        self.events.emit(UpdateEvent::InstallerDownloadFinished);
        self.events.emit(UpdateEvent::InstallerAvailableChanged(self.installer_available()));
    }

    /// Install the downloaded update.
    ///
    /// The installer checksum is verified again first. With `dry` set, the
    /// engine stops after verification.
    pub async fn install_update(&mut self, dry: bool) {
        if self.state() != EngineState::Idle || !self.installer_available() {
            debug!("Installer not available");
            self.events.emit(UpdateEvent::InstallationFailed(UpdateError::Unknown));
            return;
        }

        let Some((installer, manifest)) = self
            .latest_record()
            .and_then(|r| r.installer_path().map(|p| (p.to_path_buf(), r.manifest().clone())))
        else {
            self.events.emit(UpdateEvent::InstallationFailed(UpdateError::Unknown));
            return;
        };

        self.events.emit(UpdateEvent::InstallationStarted);
        self.set_state(EngineState::InstallingUpdate);
        info!("Installing update {} from {}", manifest.version, installer.display());

        let behavior = if self.remove_installer_on_checksum_mismatch {
            InvalidChecksumBehavior::RemoveFile
        } else {
            InvalidChecksumBehavior::KeepFile
        };
        if !verify_checksum(&installer, &manifest.checksum, manifest.checksum_algorithm, behavior).await {
            self.fail_installation(UpdateError::Checksum);
            if !installer.exists() {
                self.forget_installer();
            }
            return;
        }

        if dry {
            self.set_state(EngineState::Idle);
            self.events.emit(UpdateEvent::InstallationFinished);
            return;
        }

        match self.install_mode {
            InstallMode::Execute => {
                if let Err(e) = self.launcher.launch(&installer) {
                    warn!("{:#}", e);
                    self.fail_installation(UpdateError::InstallerExecution);
                    return;
                }
                self.set_state(EngineState::Idle);
                self.events.emit(UpdateEvent::InstallationFinished);
                if self.quit_after_install_launch {
                    info!("Application should quit to let the installer run");
                    self.events.emit(UpdateEvent::QuitRequested);
                }
            }
            InstallMode::MoveToDirectory => {
                if let Err(e) = self.move_installer(&installer).await {
                    warn!("{:#}", e);
                    self.fail_installation(UpdateError::Disk);
                    return;
                }
                self.set_state(EngineState::Idle);
                self.events.emit(UpdateEvent::InstallationFinished);
                self.forget_installer();
            }
        }
    }

    async fn move_installer(&self, installer: &Path) -> Result<PathBuf> {
        use anyhow::Context;

        let dir = self
            .installer_destination_dir
            .as_deref()
            .filter(|d| !d.as_os_str().is_empty())
            .ok_or_else(|| anyhow::anyhow!("No installer destination directory configured"))?;
        let file_name = installer
            .file_name()
            .ok_or_else(|| anyhow::anyhow!("Installer path has no file name: {}", installer.display()))?;
        let destination = dir.join(file_name);

        tokio::fs::copy(installer, &destination).await.with_context(|| {
            format!("Failed to copy installer to {}", destination.display())
        })?;
        tokio::fs::remove_file(installer)
            .await
            .with_context(|| format!("Failed to remove {}", installer.display()))?;

        info!("Installer moved to {}", destination.display());
        Ok(destination)
    }

    fn fail_installation(&mut self, error: UpdateError) {
        self.set_state(EngineState::Idle);
        self.events.emit(UpdateEvent::InstallationFailed(error));
    }

    fn forget_installer(&mut self) {
        if let Some(record) = self.latest_record_mut() {
            record.set_installer(None);
        }
        self.events.emit(UpdateEvent::InstallerAvailableChanged(false));
    }

    /// Passive scheduler: every hour, run [`check_for_update`](Self::check_for_update)
    /// when the frequency is [`CheckFrequency::EveryHour`]. Returns once
    /// `shutdown` is cancelled.
    pub async fn run_scheduled(&mut self, shutdown: CancellationToken) {
        self.run_scheduled_every(SCHEDULED_CHECK_INTERVAL, shutdown).await;
    }

    pub async fn run_scheduled_every(&mut self, period: Duration, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => {
                    debug!("Update scheduler stopped");
                    return;
                }
                _ = ticker.tick() => {
                    if self.frequency == CheckFrequency::EveryHour {
                        self.check_for_update().await;
                    }
                }
            }
        }
    }

    fn set_state(&self, state: EngineState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!("Update engine: {} -> {}", previous, state);
            self.events.emit(UpdateEvent::StateChanged(state));
        }
    }

    fn progress_callback(&self, make: fn(u8) -> UpdateEvent) -> crate::downloader::ProgressFn {
        self.progress.store(0, Ordering::Relaxed);
        let progress = Arc::clone(&self.progress);
        self.events
            .progress_emitter(make, move |percent| progress.store(percent, Ordering::Relaxed))
    }

    fn store_setting(&self, key: &str, value: &str) {
        if let Err(e) = self.settings.set(key, value) {
            warn!("Failed to persist {}: {:#}", key, e);
        }
    }

    fn forget_setting(&self, key: &str) {
        if let Err(e) = self.settings.remove(key) {
            warn!("Failed to forget {}: {:#}", key, e);
        }
    }
}
