//! Check the update server for a newer version.

use super::Session;
use anyhow::Result;
use clap::Args;
use colored::Colorize;

/// Ask the update server whether a newer version is published.
///
/// Without `--force` the check only happens when the configured frequency
/// says one is due, exactly like a passive check at application start.
#[derive(Args, Debug)]
pub struct CheckCommand {
    /// Check now regardless of the frequency and the last check time
    #[arg(long)]
    pub force: bool,
}

impl CheckCommand {
    pub(super) async fn execute(self, mut session: Session) -> Result<()> {
        session.require_server_url()?;
        session.check(self.force).await;

        if !session.reporter.checked() {
            if !session.quiet() {
                let last = session
                    .engine
                    .last_check_time()
                    .map_or_else(|| "never".to_string(), |t| t.to_rfc3339());
                println!(
                    "No check due (frequency: {}, last check: {}). Use {} to check now.",
                    session.engine.frequency(),
                    last,
                    "--force".bold()
                );
            }
            return Ok(());
        }

        session.ensure_check_succeeded()?;

        if session.quiet() {
            return Ok(());
        }

        let engine = &session.engine;
        if engine.update_available() {
            if let Some(date) = engine.latest_version_date() {
                println!("  Released: {}", date.format("%Y-%m-%d"));
            }
            if let Some(path) = engine.latest_record().and_then(|r| r.changelog_path()) {
                println!("  Changelog: {}", path.display());
            }
            if let Some((stage, error)) = session.reporter.failure() {
                println!("{} {} failed: {}", "Warning:".yellow(), stage, error);
            }
            println!("Run {} to install it.", "appcast install".bold());
        } else {
            println!(
                "{} {} is up to date",
                "✓".green(),
                engine.current_version().to_string().bold()
            );
        }
        Ok(())
    }
}
