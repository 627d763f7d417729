//! Command-line interface for the appcast updater.
//!
//! The `appcast` binary is a thin front end over [`UpdateEngine`]: every
//! command builds an engine from the configuration file and the persisted
//! settings, runs one or more engine operations, and renders the events
//! they produce.
//!
//! # Commands
//!
//! - `check` - ask the update server whether a newer version exists
//! - `download` - download the changelog or the installer of the latest version
//! - `install` - download (if needed), verify and install the latest version
//! - `status` - show the current version and update settings
//! - `frequency` - show or change how often passive checks run
//! - `watch` - keep running and check on schedule until Ctrl-C
//!
//! # Global options
//!
//! - `--config` selects the TOML configuration (default `<config dir>/appcast/config.toml`)
//! - `--settings` selects the settings file (default `<data dir>/appcast/settings.toml`)
//! - `--server-url`, `--working-dir` and `--current-version` override the configuration
//! - `--verbose` / `--quiet` control logging, `--no-progress` hides progress bars

mod check;
mod download;
mod frequency;
mod install;
pub mod reporter;
mod status;
mod watch;

use crate::config::UpdaterConfig;
use crate::core::UpdateError;
use crate::engine::{UpdateEngine, UpdateEvent};
use crate::settings::FileSettings;
use anyhow::Result;
use clap::{Parser, Subcommand};
use reporter::{Reporter, drive};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Main CLI structure for the `appcast` binary.
#[derive(Parser, Debug)]
#[command(
    name = "appcast",
    about = "Check, download and install application updates published as appcasts",
    version,
    long_about = "appcast fetches a small JSON appcast from an update server, compares it with the running \
                  version, downloads the changelog and installer, verifies the installer checksum and \
                  hands it over for installation."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging on stderr.
    ///
    /// Equivalent to `RUST_LOG=appcast_updater=debug`. Mutually exclusive
    /// with `--quiet`.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only print errors.
    ///
    /// Suppresses informational messages and progress indicators; the exit
    /// status still reports failures.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the updater configuration file.
    ///
    /// Without this option `<config dir>/appcast/config.toml` is used when it
    /// exists, otherwise built-in defaults.
    #[arg(short, long, global = true, env = "APPCAST_CONFIG")]
    config: Option<PathBuf>,

    /// Path to the settings file holding the last check time and frequency.
    #[arg(long, global = true, env = "APPCAST_SETTINGS")]
    settings: Option<PathBuf>,

    /// Appcast URL, overriding `server_url` from the configuration.
    #[arg(long, global = true)]
    server_url: Option<String>,

    /// Download directory, overriding `working_dir` from the configuration.
    #[arg(long, global = true)]
    working_dir: Option<PathBuf>,

    /// Version of the running application, overriding `current_version`.
    #[arg(long, global = true)]
    current_version: Option<String>,

    /// Disable progress bars and spinners.
    ///
    /// Setting `APPCAST_NO_PROGRESS` has the same effect.
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check the update server for a newer version
    Check(check::CheckCommand),

    /// Download the changelog or installer of the latest version
    Download(download::DownloadCommand),

    /// Install the latest version
    Install(install::InstallCommand),

    /// Show the current version and update settings
    Status(status::StatusCommand),

    /// Show or change the passive check frequency
    Frequency(frequency::FrequencyCommand),

    /// Keep running and check for updates on schedule
    Watch(watch::WatchCommand),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        init_logging(self.verbose, self.quiet);

        let config = self.load_config().await?;
        let settings_path = match &self.settings {
            Some(path) => path.clone(),
            None => FileSettings::default_path()?,
        };
        let settings = Arc::new(FileSettings::open(settings_path)?);
        debug!("Using settings file {}", settings.path().display());

        let engine = UpdateEngine::new(config, settings)?;
        let session = Session::new(engine, Reporter::new(self.quiet, self.no_progress));

        match self.command {
            Commands::Check(cmd) => cmd.execute(session).await,
            Commands::Download(cmd) => cmd.execute(session).await,
            Commands::Install(cmd) => cmd.execute(session).await,
            Commands::Status(cmd) => cmd.execute(session),
            Commands::Frequency(cmd) => cmd.execute(session),
            Commands::Watch(cmd) => cmd.execute(session).await,
        }
    }

    async fn load_config(&self) -> Result<UpdaterConfig> {
        let mut config = match &self.config {
            Some(path) => UpdaterConfig::load_from(path).await?,
            None => {
                let path = UpdaterConfig::default_path()?;
                if path.exists() {
                    UpdaterConfig::load_from(&path).await?
                } else {
                    debug!("No configuration at {}, using defaults", path.display());
                    UpdaterConfig::default()
                }
            }
        };

        if let Some(url) = &self.server_url {
            config.server_url = Some(url.clone());
        }
        if let Some(dir) = &self.working_dir {
            config.working_dir = Some(dir.clone());
        }
        if let Some(version) = &self.current_version {
            config.current_version = version.clone();
        }
        Ok(config)
    }
}

/// Install the stderr subscriber. `RUST_LOG` applies unless a flag overrides it.
fn init_logging(verbose: bool, quiet: bool) {
    let filter = if verbose {
        EnvFilter::new("appcast_updater=debug")
    } else if quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// An engine, its event stream and the reporter rendering it.
pub(crate) struct Session {
    engine: UpdateEngine,
    events: UnboundedReceiver<UpdateEvent>,
    reporter: Reporter,
}

impl Session {
    fn new(engine: UpdateEngine, reporter: Reporter) -> Self {
        let events = engine.subscribe();
        Self {
            engine,
            events,
            reporter,
        }
    }

    fn quiet(&self) -> bool {
        self.reporter.is_quiet()
    }

    async fn check(&mut self, force: bool) {
        let handle = self.engine.cancel_handle();
        let interrupt = || {
            handle.cancel();
        };
        if force {
            drive(self.engine.force_check_for_update(), &mut self.events, &mut self.reporter, interrupt)
                .await;
        } else {
            drive(self.engine.check_for_update(), &mut self.events, &mut self.reporter, interrupt).await;
        }
    }

    async fn download_changelog(&mut self) {
        self.reporter.reset_outcome();
        let handle = self.engine.cancel_handle();
        drive(self.engine.download_changelog(), &mut self.events, &mut self.reporter, || {
            handle.cancel();
        })
        .await;
    }

    async fn download_installer(&mut self) {
        self.reporter.reset_outcome();
        let handle = self.engine.cancel_handle();
        drive(self.engine.download_installer(), &mut self.events, &mut self.reporter, || {
            handle.cancel();
        })
        .await;
    }

    async fn install(&mut self, dry: bool) {
        self.reporter.reset_outcome();
        drive(self.engine.install_update(dry), &mut self.events, &mut self.reporter, || {}).await;
    }

    fn require_server_url(&self) -> Result<()> {
        if self.engine.server_url().is_empty() {
            return Err(anyhow::Error::new(UpdateError::Url).context("No update server configured"));
        }
        Ok(())
    }

    /// Fail when the last check was cancelled or could not produce any record.
    fn ensure_check_succeeded(&self) -> Result<()> {
        if self.reporter.was_cancelled() {
            anyhow::bail!("Update check cancelled");
        }
        if let Some(error) = self.reporter.check_failure() {
            return Err(anyhow::Error::new(error).context("Update check failed"));
        }
        Ok(())
    }

    /// Fail with the first reported error, if any.
    fn ensure_no_failure(&self) -> Result<()> {
        if self.reporter.was_cancelled() {
            anyhow::bail!("Operation cancelled");
        }
        if let Some((stage, error)) = self.reporter.failure() {
            return Err(anyhow::Error::new(error).context(format!("Update {stage} failed")));
        }
        Ok(())
    }
}
