//! Terminal rendering of engine events.
//!
//! [`drive`] runs one engine operation while draining its event stream, so
//! progress bars move as the download progresses and Ctrl-C reaches the
//! engine while the operation is still running.

use crate::core::UpdateError;
use crate::engine::{EngineState, UpdateAvailability, UpdateEvent};
use crate::utils::progress::ProgressBar;
use colored::Colorize;
use semver::Version;
use std::future::Future;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::debug;

/// Collects the outcome of engine operations and renders events.
#[derive(Default)]
pub struct Reporter {
    quiet: bool,
    no_progress: bool,
    bar: Option<ProgressBar>,
    failures: Vec<(&'static str, UpdateError)>,
    cancelled: bool,
    quit_requested: bool,
    checked: bool,
    latest: Option<Version>,
}

impl Reporter {
    pub fn new(quiet: bool, no_progress: bool) -> Self {
        Self {
            quiet,
            no_progress,
            ..Self::default()
        }
    }

    /// Forget failures and cancellations before starting another operation.
    pub fn reset_outcome(&mut self) {
        self.failures.clear();
        self.cancelled = false;
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// First failure seen, with the stage it happened in.
    pub fn failure(&self) -> Option<(&'static str, UpdateError)> {
        self.failures.first().copied()
    }

    pub fn was_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    /// Whether a check actually reached for the server.
    pub fn checked(&self) -> bool {
        self.checked
    }

    /// Failure of the update check itself, ignoring follow-up downloads.
    pub fn check_failure(&self) -> Option<UpdateError> {
        self.failures.iter().find(|(stage, _)| *stage == "check").map(|(_, e)| *e)
    }

    fn say(&self, message: impl std::fmt::Display) {
        if !self.quiet {
            println!("{message}");
        }
    }

    fn start_bar(&mut self, label: &str, spinner: bool) {
        self.clear_bar();
        if self.quiet || self.no_progress {
            return;
        }
        self.bar = Some(if spinner {
            ProgressBar::new_spinner(label.to_string())
        } else {
            ProgressBar::new_percentage(label.to_string())
        });
    }

    fn clear_bar(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }

    fn progress(&self, percent: u8) {
        if let Some(bar) = &self.bar {
            bar.set_position(u64::from(percent));
        }
    }

    pub fn handle(&mut self, event: UpdateEvent) {
        debug!("Event: {:?}", event);
        match event {
            UpdateEvent::CheckStarted => {
                self.checked = true;
                self.start_bar("Checking for updates...", true);
            }
            UpdateEvent::CheckOnlineFailed => {
                self.clear_bar();
                self.say("Update server unreachable, looking for a previous download".yellow());
            }
            UpdateEvent::CheckFailed(error) => {
                self.clear_bar();
                self.failures.push(("check", error));
            }
            UpdateEvent::CheckCancelled => {
                self.clear_bar();
                self.cancelled = true;
                self.say("Update check cancelled".yellow());
            }
            UpdateEvent::CheckFinished => self.clear_bar(),
            UpdateEvent::LatestVersionChanged(version) => self.latest = Some(version),
            UpdateEvent::UpdateAvailabilityChanged(UpdateAvailability::Available) => {
                let version = self.latest.as_ref().map(ToString::to_string).unwrap_or_default();
                self.say(format!("{} {}", "Update available:".green().bold(), version.bold()));
            }

            UpdateEvent::ChangelogDownloadStarted => self.start_bar("changelog", false),
            UpdateEvent::InstallerDownloadStarted => self.start_bar("installer", false),
            UpdateEvent::ChangelogDownloadProgress(p) | UpdateEvent::InstallerDownloadProgress(p) => {
                self.progress(p);
            }
            UpdateEvent::ChangelogDownloadFinished => {
                self.clear_bar();
                self.say(format!("{} changelog downloaded", "✓".green()));
            }
            UpdateEvent::InstallerDownloadFinished => {
                self.clear_bar();
                self.say(format!("{} installer downloaded and verified", "✓".green()));
            }
            UpdateEvent::ChangelogDownloadFailed(error) => {
                self.clear_bar();
                self.failures.push(("changelog download", error));
            }
            UpdateEvent::InstallerDownloadFailed(error) => {
                self.clear_bar();
                self.failures.push(("installer download", error));
            }
            UpdateEvent::ChangelogDownloadCancelled | UpdateEvent::InstallerDownloadCancelled => {
                self.clear_bar();
                self.cancelled = true;
                self.say("Download cancelled".yellow());
            }

            UpdateEvent::InstallationStarted => self.say("Installing update...".cyan()),
            UpdateEvent::InstallationFailed(error) => self.failures.push(("installation", error)),
            UpdateEvent::InstallationFinished => {
                self.say(format!("{} installation step finished", "✓".green()));
            }
            UpdateEvent::QuitRequested => self.quit_requested = true,

            UpdateEvent::StateChanged(EngineState::Idle) => self.clear_bar(),
            _ => {}
        }
    }
}

/// Run `operation` to completion while rendering events.
///
/// `on_interrupt` is called on Ctrl-C; the operation keeps running until it
/// observes the cancellation and returns.
pub async fn drive<F, T>(
    operation: F,
    events: &mut UnboundedReceiver<UpdateEvent>,
    reporter: &mut Reporter,
    on_interrupt: impl Fn(),
) -> T
where
    F: Future<Output = T>,
{
    tokio::pin!(operation);

    let output = loop {
        tokio::select! {
            output = &mut operation => break output,
            Some(event) = events.recv() => reporter.handle(event),
            Ok(()) = tokio::signal::ctrl_c() => on_interrupt(),
        }
    };

    while let Ok(event) = events.try_recv() {
        reporter.handle(event);
    }
    reporter.clear_bar();
    output
}
