//! An appcast together with the artifacts downloaded for it.

use super::AppcastManifest;
use crate::engine::InstallMode;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

/// Extensions Windows will run directly.
const WINDOWS_EXECUTABLE_EXTENSIONS: &[&str] = &["exe", "msi", "bat", "cmd", "com"];

/// A release as known by the engine: its manifest plus local file locations.
///
/// The changelog text is read from disk on first access and cached until the
/// changelog path changes.
#[derive(Debug, Clone)]
pub struct UpdateRecord {
    manifest: AppcastManifest,
    installer_path: Option<PathBuf>,
    changelog_path: Option<PathBuf>,
    changelog_text: OnceLock<String>,
}

impl UpdateRecord {
    pub fn new(manifest: AppcastManifest) -> Self {
        Self {
            manifest,
            installer_path: None,
            changelog_path: None,
            changelog_text: OnceLock::new(),
        }
    }

    pub fn with_artifacts(manifest: AppcastManifest, installer: PathBuf, changelog: PathBuf) -> Self {
        let mut record = Self::new(manifest);
        record.installer_path = Some(installer);
        record.changelog_path = Some(changelog);
        record
    }

    pub fn manifest(&self) -> &AppcastManifest {
        &self.manifest
    }

    pub fn installer_path(&self) -> Option<&Path> {
        self.installer_path.as_deref()
    }

    pub fn changelog_path(&self) -> Option<&Path> {
        self.changelog_path.as_deref()
    }

    pub fn set_installer(&mut self, path: Option<PathBuf>) {
        self.installer_path = path;
    }

    pub fn set_changelog(&mut self, path: Option<PathBuf>) {
        if self.changelog_path != path {
            self.changelog_text = OnceLock::new();
        }
        self.changelog_path = path;
    }

    pub fn ready_to_show_changelog(&self) -> bool {
        self.changelog_path.as_deref().is_some_and(Path::is_file)
    }

    pub fn ready_to_install(&self, mode: InstallMode) -> bool {
        let Some(installer) = self.installer_path.as_deref() else {
            return false;
        };
        if !installer.is_file() {
            return false;
        }

        if cfg!(windows) && mode == InstallMode::Execute {
            return is_windows_executable(installer);
        }
        true
    }

    /// Changelog contents, empty when the changelog is absent or unreadable.
    pub fn changelog_text(&self) -> &str {
        self.changelog_text.get_or_init(|| {
            let Some(path) = self.changelog_path.as_deref() else {
                return String::new();
            };
            std::fs::read_to_string(path).unwrap_or_else(|e| {
                debug!("Cannot read changelog {}: {}", path.display(), e);
                String::new()
            })
        })
    }
}

fn is_windows_executable(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| WINDOWS_EXECUTABLE_EXTENSIONS.iter().any(|x| ext.eq_ignore_ascii_case(x)))
}
