//! Updater configuration
//!
//! [`UpdaterConfig`] gathers everything the host application knows about
//! itself and its update channel. It can be built in code or loaded from a
//! TOML file:
//!
//! ```toml
//! app_name = "my-app"
//! current_version = "1.0.0"
//! current_version_date = "01/01/2021"
//! server_url = "https://updates.example.com/my-app/linux"
//! check_timeout_secs = 30
//! default_frequency = "EveryDay"
//! install_mode = "Execute"
//! quit_after_install_launch = true
//! ```
//!
//! Every field has a default, so a partial file is valid. The default
//! location is `<config dir>/appcast/config.toml`.

use crate::appcast::parse_date;
use crate::appcast::version::parse_version;
use crate::constants::DEFAULT_CHECK_TIMEOUT;
use crate::engine::{CheckFrequency, InstallMode};
use crate::utils::fs::default_working_dir;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdaterConfig {
    /// Application name, used for the default working directory
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Version of the running application
    #[serde(default = "default_current_version")]
    pub current_version: String,

    /// Release date of the running application (`dd/mm/yyyy`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_version_date: Option<String>,

    /// Appcast URL; no check happens until one is set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,

    /// Where appcasts, changelogs and installers are downloaded.
    /// Defaults to `<temp>/<app_name>/Update`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,

    #[serde(default = "default_check_timeout_secs")]
    pub check_timeout_secs: u64,

    /// Frequency used until the user picks one (the persisted value wins)
    #[serde(default)]
    pub default_frequency: CheckFrequency,

    #[serde(default)]
    pub install_mode: InstallMode,

    /// Destination for [`InstallMode::MoveToDirectory`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installer_destination_dir: Option<PathBuf>,

    /// Ask the host to quit once the installer is launched
    #[serde(default = "default_quit_after_install_launch")]
    pub quit_after_install_launch: bool,

    /// Delete the installer when verification fails right before install
    #[serde(default)]
    pub remove_installer_on_checksum_mismatch: bool,

    /// Changelog of the running version, shown when no update is known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_changelog_path: Option<PathBuf>,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            current_version: default_current_version(),
            current_version_date: None,
            server_url: None,
            working_dir: None,
            check_timeout_secs: default_check_timeout_secs(),
            default_frequency: CheckFrequency::default(),
            install_mode: InstallMode::default(),
            installer_destination_dir: None,
            quit_after_install_launch: default_quit_after_install_launch(),
            remove_installer_on_checksum_mismatch: false,
            current_changelog_path: None,
        }
    }
}

fn default_app_name() -> String {
    "app".to_string()
}

fn default_current_version() -> String {
    "0.0.0".to_string()
}

fn default_check_timeout_secs() -> u64 {
    DEFAULT_CHECK_TIMEOUT.as_secs()
}

fn default_quit_after_install_launch() -> bool {
    true
}

impl UpdaterConfig {
    pub fn new(app_name: impl Into<String>, current_version: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            current_version: current_version.into(),
            ..Self::default()
        }
    }

    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read updater config from {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse updater config from {}", path.display()))
    }

    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize updater config")?;
        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write updater config to {}", path.display()))
    }

    pub fn default_path() -> Result<PathBuf> {
        Ok(dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Unable to determine config directory"))?
            .join("appcast")
            .join("config.toml"))
    }

    pub fn working_dir(&self) -> PathBuf {
        self.working_dir.clone().unwrap_or_else(|| default_working_dir(&self.app_name))
    }

    pub fn check_timeout(&self) -> Duration {
        Duration::from_secs(self.check_timeout_secs)
    }

    pub fn parsed_current_version(&self) -> Result<Version> {
        parse_version(&self.current_version)
            .ok_or_else(|| anyhow::anyhow!("Invalid current version '{}'", self.current_version))
    }

    pub fn parsed_current_version_date(&self) -> Result<Option<NaiveDate>> {
        self.current_version_date
            .as_deref()
            .map(|raw| {
                parse_date(raw)
                    .ok_or_else(|| anyhow::anyhow!("Invalid current version date '{raw}' (expected dd/mm/yyyy)"))
            })
            .transpose()
    }
}
