//! Starting a downloaded installer as a detached process.
//!
//! The engine never waits for the installer: it spawns it and moves on, and
//! the host usually quits right after so the installer can replace it.

use anyhow::{Context, Result};
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::info;

/// Starts installers on behalf of the update engine.
pub trait InstallerLauncher: Send + Sync {
    fn launch(&self, installer: &Path) -> Result<()>;
}

/// Launches installers with the platform's native mechanism.
///
/// - Windows: the installer itself is executed
/// - macOS: the file is handed to `open` (mounts `.dmg`, runs `.pkg`)
/// - other Unix: executed directly when it has an executable bit,
///   otherwise handed to `xdg-open`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher;

impl SystemLauncher {
    fn command_for(installer: &Path) -> Command {
        if cfg!(target_os = "windows") {
            Command::new(installer)
        } else if cfg!(target_os = "macos") {
            let mut command = Command::new("open");
            command.arg(installer);
            command
        } else if is_executable(installer) {
            Command::new(installer)
        } else {
            let mut command = Command::new("xdg-open");
            command.arg(installer);
            command
        }
    }
}

impl InstallerLauncher for SystemLauncher {
    fn launch(&self, installer: &Path) -> Result<()> {
        let mut command = Self::command_for(installer);
        if let Some(dir) = installer.parent() {
            command.current_dir(dir);
        }

        let child = command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to start installer {}", installer.display()))?;

        info!("Started installer {} (pid {})", installer.display(), child.id());
        Ok(())
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path).is_ok_and(|m| m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    true
}
