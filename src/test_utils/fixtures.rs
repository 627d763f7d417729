//! Test fixtures for creating sample appcasts and installer launchers

use crate::appcast::{AppcastDocument, AppcastManifest};
use crate::launcher::InstallerLauncher;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Builder for appcast documents laid out like a real update server:
/// `<base>/win/installer-X.Y.exe` and `<base>/changelog-X.Y.md`.
#[derive(Clone, Debug)]
pub struct AppcastFixture {
    pub document: AppcastDocument,
}

impl AppcastFixture {
    pub fn new(version: &str, base_url: &str) -> Self {
        let short: Vec<&str> = version.split('.').take(2).collect();
        let short = short.join(".");
        let base = base_url.trim_end_matches('/');

        Self {
            document: AppcastDocument {
                version: Some(version.to_string()),
                date: Some("01/01/2021".to_string()),
                checksum: None,
                checksum_type: None,
                installer_url: Some(format!("{base}/win/installer-{short}.exe")),
                changelog_url: Some(format!("{base}/changelog-{short}.md")),
            },
        }
    }

    pub fn with_md5(self, checksum: &str) -> Self {
        self.with_checksum("md5", checksum)
    }

    pub fn with_checksum(mut self, checksum_type: &str, checksum: &str) -> Self {
        self.document.checksum_type = Some(checksum_type.to_string());
        self.document.checksum = Some(checksum.to_string());
        self
    }

    pub fn with_date(mut self, date: &str) -> Self {
        self.document.date = Some(date.to_string());
        self
    }

    pub fn without_changelog(mut self) -> Self {
        self.document.changelog_url = None;
        self
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.document).unwrap_or_default()
    }

    /// The validated manifest; panics when the fixture is invalid.
    pub fn manifest(&self) -> AppcastManifest {
        AppcastManifest::from_document(self.document.clone())
            .unwrap_or_else(|e| panic!("invalid appcast fixture: {e}"))
    }

    pub fn write_to(&self, path: &Path) -> Result<PathBuf> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_json())
            .with_context(|| format!("Failed to write appcast fixture to {}", path.display()))?;
        Ok(path.to_path_buf())
    }
}

/// Launcher that records installers instead of starting them.
#[derive(Debug, Default)]
pub struct RecordingLauncher {
    launched: Mutex<Vec<PathBuf>>,
    fail: bool,
}

impl RecordingLauncher {
    /// A launcher whose every launch fails.
    pub fn failing() -> Self {
        Self {
            launched: Mutex::default(),
            fail: true,
        }
    }

    pub fn launched(&self) -> Vec<PathBuf> {
        self.launched.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

impl InstallerLauncher for RecordingLauncher {
    fn launch(&self, installer: &Path) -> Result<()> {
        if self.fail {
            anyhow::bail!("refusing to start {}", installer.display());
        }
        if let Ok(mut launched) = self.launched.lock() {
            launched.push(installer.to_path_buf());
        }
        Ok(())
    }
}
