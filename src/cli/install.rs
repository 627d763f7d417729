//! Install the latest version.

use super::Session;
use crate::engine::InstallMode;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

/// Check the server, download the installer when needed, verify it and
/// install it.
///
/// By default the installer is launched; with `--move-to` it is moved into
/// the given directory instead.
#[derive(Args, Debug)]
pub struct InstallCommand {
    /// Verify the installer without launching or moving it
    #[arg(long)]
    pub dry: bool,

    /// Move the installer into this existing directory instead of launching it
    #[arg(long, value_name = "DIR")]
    pub move_to: Option<PathBuf>,
}

impl InstallCommand {
    pub(super) async fn execute(self, mut session: Session) -> Result<()> {
        session.require_server_url()?;

        if let Some(dir) = self.move_to {
            session.engine.set_install_mode(InstallMode::MoveToDirectory);
            session.engine.set_installer_destination_dir(Some(dir));
        }

        session.check(true).await;
        session.ensure_check_succeeded()?;

        if !session.engine.update_available() {
            if !session.quiet() {
                println!(
                    "{} {} is up to date, nothing to install",
                    "✓".green(),
                    session.engine.current_version().to_string().bold()
                );
            }
            return Ok(());
        }

        if !session.engine.installer_available() {
            session.download_installer().await;
            session.ensure_no_failure()?;
        }

        session.install(self.dry).await;
        session.ensure_no_failure()?;

        if session.quiet() {
            return Ok(());
        }
        if self.dry {
            println!("Installer verified, not installed (--dry)");
        } else if session.engine.install_mode() == InstallMode::MoveToDirectory {
            if let Some(dir) = session.engine.installer_destination_dir() {
                println!("Installer moved to {}", dir.display());
            }
        } else if session.reporter.quit_requested() {
            println!("Installer started. Quit the application so it can be replaced.");
        }
        Ok(())
    }
}
