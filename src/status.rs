//! Coarse simulation status
//!
//! The six predicates reported by an attempt are not mutually exclusive (a
//! scheduler can flag a job both finished and out of time). They are
//! collapsed with a fixed precedence, first match wins:
//!
//! ```text
//! not started → queueing → running → exceeded time limit → finished → failed → unknown
//! ```
//!
//! Exceeded-time-limit outranks finished because it is what triggers a
//! restart.

use crate::run::RunHandle;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Collapsed status of the current attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimulationStatus {
    /// No attempt submitted yet.
    NotStarted,
    /// Waiting in the batch queue.
    Queueing,
    /// Executing.
    Running,
    /// Killed for exhausting the wall-clock allowance.
    ExceededTimeLimit,
    /// Completed normally.
    Finished,
    /// Ended with another error.
    Failed,
    /// No predicate held.
    Unknown,
}

impl SimulationStatus {
    /// Collapse raw predicates in precedence order.
    #[must_use]
    pub const fn from_predicates(
        started: bool,
        queueing: bool,
        running: bool,
        exceeded_time_limit: bool,
        finished: bool,
        failed: bool,
    ) -> Self {
        if !started {
            Self::NotStarted
        } else if queueing {
            Self::Queueing
        } else if running {
            Self::Running
        } else if exceeded_time_limit {
            Self::ExceededTimeLimit
        } else if finished {
            Self::Finished
        } else if failed {
            Self::Failed
        } else {
            Self::Unknown
        }
    }

    /// Query an attempt's predicates and collapse them.
    #[must_use]
    pub fn of<R: RunHandle>(run: &R) -> Self {
        Self::from_predicates(
            run.has_started(),
            run.is_queueing(),
            run.is_running(),
            run.has_exceeded_time_limit(),
            run.has_finished(),
            run.has_failed(),
        )
    }

    /// Human-readable phrase.
    #[must_use]
    pub const fn phrase(self) -> &'static str {
        match self {
            Self::NotStarted => "has not started",
            Self::Queueing => "is queueing",
            Self::Running => "is running",
            Self::ExceededTimeLimit => "has exceeded the time limit",
            Self::Finished => "has finished",
            Self::Failed => "has failed",
            Self::Unknown => "has unknown status",
        }
    }

    /// Polling can stop: the simulation will not progress on its own.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Failed)
    }
}

impl fmt::Display for SimulationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.phrase())
    }
}

/// Display name derived from the current attempt name.
///
/// `init_<base>` → `<base> (init)`, `restart_<base>_<n>` → `<base> (restart n)`,
/// anything else → `<base>`.
#[must_use]
pub fn display_name(basename: &str, attempt_name: &str) -> String {
    if attempt_name.starts_with("init_") {
        format!("{basename} (init)")
    } else if attempt_name.starts_with("restart_") {
        let ordinal = attempt_name.rsplit('_').next().unwrap_or_default();
        format!("{basename} (restart {ordinal})")
    } else {
        basename.to_string()
    }
}

/// Status paired with the simulation's display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    /// Display name, e.g. `he_flux (restart 2)`
    pub display_name: String,
    /// Collapsed status
    pub status: SimulationStatus,
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.display_name, self.status.phrase())
    }
}
