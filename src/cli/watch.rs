//! Keep running and check for updates on schedule.

use super::Session;
use super::reporter::drive;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use tokio_util::sync::CancellationToken;

/// Run a passive check now, then keep checking every hour while the
/// frequency is `EveryHour`. Stops on Ctrl-C.
#[derive(Args, Debug)]
pub struct WatchCommand {}

impl WatchCommand {
    pub(super) async fn execute(self, mut session: Session) -> Result<()> {
        session.require_server_url()?;

        if !session.quiet() {
            println!(
                "Watching {} (frequency: {}). Press Ctrl-C to stop.",
                session.engine.server_url().cyan(),
                session.engine.frequency()
            );
        }

        session.check(false).await;
        if session.reporter.was_cancelled() {
            return Ok(());
        }

        let shutdown = CancellationToken::new();
        let handle = session.engine.cancel_handle();
        let stop = shutdown.clone();
        drive(
            session.engine.run_scheduled(shutdown),
            &mut session.events,
            &mut session.reporter,
            move || {
                stop.cancel();
                handle.cancel();
            },
        )
        .await;

        Ok(())
    }
}
