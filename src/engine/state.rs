//! State, frequency and availability types of the update engine.

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What the engine is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EngineState {
    #[default]
    Idle,
    CheckingForUpdate,
    DownloadingChangelog,
    DownloadingInstaller,
    InstallingUpdate,
}

impl EngineState {
    /// Whether [`cancel`](super::UpdateEngine::cancel) has anything to stop.
    pub fn is_cancellable(self) -> bool {
        !matches!(self, Self::Idle | Self::InstallingUpdate)
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::CheckingForUpdate => "checking for update",
            Self::DownloadingChangelog => "downloading changelog",
            Self::DownloadingInstaller => "downloading installer",
            Self::InstallingUpdate => "installing update",
        };
        f.write_str(label)
    }
}

/// How often a passive check is allowed to reach the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CheckFrequency {
    Never,
    EveryStart,
    EveryHour,
    #[default]
    EveryDay,
    EveryWeek,
    EveryTwoWeeks,
    EveryMonth,
}

impl CheckFrequency {
    pub const ALL: [Self; 7] = [
        Self::Never,
        Self::EveryStart,
        Self::EveryHour,
        Self::EveryDay,
        Self::EveryWeek,
        Self::EveryTwoWeeks,
        Self::EveryMonth,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Never => "Never",
            Self::EveryStart => "EveryStart",
            Self::EveryHour => "EveryHour",
            Self::EveryDay => "EveryDay",
            Self::EveryWeek => "EveryWeek",
            Self::EveryTwoWeeks => "EveryTwoWeeks",
            Self::EveryMonth => "EveryMonth",
        }
    }

    /// Earliest instant after which the next passive check is due.
    ///
    /// `None` for [`CheckFrequency::Never`].
    pub fn next_check_after(self, last_check: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Never => None,
            Self::EveryStart => Some(last_check),
            Self::EveryHour => Some(last_check + Duration::hours(1)),
            Self::EveryDay => Some(last_check + Duration::days(1)),
            Self::EveryWeek => Some(last_check + Duration::days(7)),
            Self::EveryTwoWeeks => Some(last_check + Duration::days(14)),
            Self::EveryMonth => last_check.checked_add_months(Months::new(1)),
        }
    }

    /// Whether a passive check at `now` should go to the server.
    ///
    /// Due iff `last_check + interval < now`; without a recorded last check
    /// every frequency but `Never` is due.
    pub fn is_due(self, last_check: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        if self == Self::Never {
            return false;
        }
        match last_check {
            None => true,
            Some(last) => self.next_check_after(last).is_some_and(|next| next < now),
        }
    }
}

impl fmt::Display for CheckFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CheckFrequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s.chars().filter(|c| *c != '-' && *c != '_').collect();
        Self::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(&normalized))
            .ok_or_else(|| {
                let names: Vec<_> = Self::ALL.iter().map(|f| f.as_str()).collect();
                format!("unknown check frequency '{s}', expected one of: {}", names.join(", "))
            })
    }
}

/// Whether a newer release is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UpdateAvailability {
    /// No valid appcast known yet
    #[default]
    Unknown,
    UpToDate,
    Available,
}

/// What installing an update means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum InstallMode {
    /// Launch the installer as a detached process
    #[default]
    Execute,
    /// Move the installer into a destination directory for the user
    MoveToDirectory,
}
