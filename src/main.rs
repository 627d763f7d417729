//! appcast CLI entry point
//!
//! Parses the command line, runs the selected command and turns errors into
//! readable messages with suggestions:
//! - `check` - check the update server for a newer version
//! - `download` - download the changelog or installer
//! - `install` - download, verify and install the latest version
//! - `status` - show the current version and update settings
//! - `frequency` - show or change the check frequency
//! - `watch` - check on schedule until interrupted

use anyhow::Result;
use appcast_updater::cli;
use appcast_updater::core::error::user_friendly_error;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            user_friendly_error(e).display();
            std::process::exit(1);
        }
    }
}
