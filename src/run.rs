//! Single-attempt capability interface and attempt history records
//!
//! ## Lifecycle
//!
//! ```text
//! from_parts / template ──> write_files ──> start ──> (scheduler) ──> retired
//!                                                        │
//!                          queueing → running → finished | failed | exceeded time limit
//! ```
//!
//! An attempt is submitted once and never resubmitted. A restart builds a
//! new attempt on a copy of the old working directory.

use crate::params::ParameterStore;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One submission of the simulation to the batch scheduler.
///
/// The orchestrator only talks to attempts through this trait, so a real
/// scheduler binding and a test double are interchangeable. Status queries
/// must return an instantaneous snapshot and never block on the job.
pub trait RunHandle {
    /// Opaque batch-submission descriptor, carried unchanged across restarts.
    type Batch: Clone;

    /// Build a fresh, unsubmitted attempt bound to `work_dir`.
    fn from_parts(work_dir: PathBuf, parameters: ParameterStore, batch: Self::Batch) -> Self
    where
        Self: Sized;

    /// Working directory of this attempt.
    fn work_dir(&self) -> &Path;

    /// Rebind the attempt to another working directory.
    fn change_work_dir(&mut self, work_dir: PathBuf);

    /// Materialise solver input files into the working directory.
    ///
    /// # Errors
    ///
    /// Returns error if files exist and `overwrite` is false, or on IO failure.
    fn write_files(&mut self, overwrite: bool) -> Result<()>;

    /// Submit the attempt to the scheduler. Fire-and-forget.
    ///
    /// # Errors
    ///
    /// Returns error if the submission is rejected.
    fn start(&mut self) -> Result<()>;

    /// Discard transient files inherited from a copied directory.
    ///
    /// # Errors
    ///
    /// Returns error on IO failure.
    fn clean(&mut self) -> Result<()>;

    /// The attempt was submitted.
    fn has_started(&self) -> bool;
    /// Waiting in the batch queue.
    fn is_queueing(&self) -> bool;
    /// Executing on the cluster.
    fn is_running(&self) -> bool;
    /// Killed by the scheduler for exhausting its wall-clock allowance.
    fn has_exceeded_time_limit(&self) -> bool;
    /// Completed normally.
    fn has_finished(&self) -> bool;
    /// Ended with any other error.
    fn has_failed(&self) -> bool;

    /// Captured solver log, one entry per line, in order.
    ///
    /// # Errors
    ///
    /// Returns error if the log cannot be read.
    fn log_lines(&self) -> Result<Vec<String>>;

    /// Named solver parameters.
    fn parameters(&self) -> &ParameterStore;

    /// Mutable access to the named solver parameters.
    fn parameters_mut(&mut self) -> &mut ParameterStore;

    /// Batch-submission descriptor.
    fn batch(&self) -> &Self::Batch;
}

/// How an attempt came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttemptKind {
    /// First attempt of a simulation.
    Init,
    /// Continuation seeded from a time-limited predecessor, with its ordinal.
    Restart(usize),
}

/// History entry written when an attempt is submitted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttemptRecord {
    name: String,
    kind: AttemptKind,
    work_dir: PathBuf,
    submitted_at: DateTime<Utc>,
}

impl AttemptRecord {
    /// Create a record stamped with the current time.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: AttemptKind, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            kind,
            work_dir: work_dir.into(),
            submitted_at: Utc::now(),
        }
    }

    /// Attempt name (`init_<base>` or `restart_<base>_<n>`).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Init or restart ordinal.
    #[must_use]
    pub const fn kind(&self) -> AttemptKind {
        self.kind
    }

    /// Working directory the attempt was submitted from.
    #[must_use]
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Submission timestamp.
    #[must_use]
    pub const fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }
}
