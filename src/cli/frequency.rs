//! Show or change the passive check frequency.

use super::Session;
use crate::engine::CheckFrequency;
use anyhow::Result;
use clap::Args;
use colored::Colorize;

/// Show the check frequency, or persist a new one.
#[derive(Args, Debug)]
pub struct FrequencyCommand {
    /// New frequency: Never, EveryStart, EveryHour, EveryDay, EveryWeek,
    /// EveryTwoWeeks or EveryMonth
    pub frequency: Option<CheckFrequency>,
}

impl FrequencyCommand {
    pub(super) fn execute(self, mut session: Session) -> Result<()> {
        match self.frequency {
            Some(frequency) => {
                session.engine.set_frequency(frequency);
                if !session.quiet() {
                    println!("{} Check frequency set to {}", "✓".green(), frequency.to_string().bold());
                }
            }
            None => println!("{}", session.engine.frequency()),
        }
        Ok(())
    }
}
