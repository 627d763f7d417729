//! Show the current version and update settings.

use super::Session;
use anyhow::Result;
use clap::Args;
use colored::Colorize;

/// Print what the updater knows without contacting the server.
#[derive(Args, Debug)]
pub struct StatusCommand {}

impl StatusCommand {
    pub(super) fn execute(self, session: Session) -> Result<()> {
        let engine = &session.engine;
        let not_set = || "(not set)".dimmed().to_string();

        println!("{}", "Update status".bold());
        let date = engine
            .current_version_date()
            .map(|d| format!(" ({})", d.format("%Y-%m-%d")))
            .unwrap_or_default();
        println!("  Current version: {}{}", engine.current_version().to_string().cyan(), date);

        let url = engine.server_url();
        println!("  Server URL:      {}", if url.is_empty() { not_set() } else { url.to_string() });
        println!("  Frequency:       {}", engine.frequency());

        match engine.last_check_time() {
            Some(last) => {
                println!("  Last check:      {}", last.to_rfc3339());
                let next = engine
                    .frequency()
                    .next_check_after(last)
                    .map_or_else(|| "never".to_string(), |t| t.to_rfc3339());
                println!("  Next check:      after {next}");
            }
            None => println!("  Last check:      never"),
        }

        println!("  Working dir:     {}", engine.working_dir().display());
        println!("  Check timeout:   {}s", engine.check_timeout().as_secs());
        println!("  Install mode:    {:?}", engine.install_mode());
        if let Some(dir) = engine.installer_destination_dir() {
            println!("  Destination:     {}", dir.display());
        }
        Ok(())
    }
}
