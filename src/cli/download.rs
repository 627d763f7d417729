//! Download the changelog or installer of the latest version.

use super::Session;
use anyhow::Result;
use clap::{Args, ValueEnum};
use colored::Colorize;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Artifact {
    Changelog,
    Installer,
}

/// Check the server, then download one artifact of the latest version.
///
/// The installer is verified against the appcast checksum and removed when
/// it does not match.
#[derive(Args, Debug)]
pub struct DownloadCommand {
    /// What to download
    #[arg(value_enum)]
    pub artifact: Artifact,
}

impl DownloadCommand {
    pub(super) async fn execute(self, mut session: Session) -> Result<()> {
        session.require_server_url()?;
        session.check(true).await;

        session.ensure_check_succeeded()?;
        if !session.engine.update_available() {
            if !session.quiet() {
                println!(
                    "{} {} is up to date, nothing to download",
                    "✓".green(),
                    session.engine.current_version().to_string().bold()
                );
            }
            return Ok(());
        }

        let path = match self.artifact {
            Artifact::Changelog => {
                if !session.engine.changelog_available() {
                    session.download_changelog().await;
                }
                session.ensure_no_failure()?;
                session.engine.latest_record().and_then(|r| r.changelog_path()).map(ToOwned::to_owned)
            }
            Artifact::Installer => {
                if !session.engine.installer_available() {
                    session.download_installer().await;
                }
                session.ensure_no_failure()?;
                session.engine.latest_record().and_then(|r| r.installer_path()).map(ToOwned::to_owned)
            }
        };

        if let Some(path) = path.filter(|_| !session.quiet()) {
            println!("  {}", path.display());
        }
        Ok(())
    }
}
