//! Simulation configuration
//!
//! The layout mirrors what the coupled solver writes inside an attempt's
//! working directory. Renaming any of these breaks interoperability with the
//! solver's sub-stages, so the defaults are the canonical values.
//!
//! ```text
//! <attempt>/
//!   networkFile.h5                      continuation state (restarts only)
//!   last_TRIDYN.dat                     final-state copy (restarts only)
//!   work/
//!     workers__xolotlWorker_3/          checkpoint stage
//!       xolotlStop.h5
//!       retentionOut.txt  allRetentionOut.txt
//!       surface.txt       allSurface.txt
//!       tridyn.dat
//!     workers__ftridynWorker_2/         final-state stage
//!       last_TRIDYN.dat
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Fixed relative filesystem layout of an attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationLayout {
    /// Subdirectory holding all sub-stage directories
    pub work_dir: String,
    /// Sub-stage producing the checkpoint and time series
    pub checkpoint_stage: String,
    /// Sub-stage producing the final-state auxiliary file
    pub final_state_stage: String,
    /// Raw checkpoint written by the checkpoint stage
    pub checkpoint_file: String,
    /// Truncated continuation state placed in the attempt root
    pub continuation_file: String,
    /// Final-state file name (same name in stage and attempt root)
    pub final_state_file: String,
    /// Incremental retention series
    pub retention_file: String,
    /// Accumulated retention series
    pub all_retention_file: String,
    /// Incremental surface series
    pub surface_file: String,
    /// Accumulated surface series
    pub all_surface_file: String,
    /// Key-value descriptor holding the sticking coefficient
    pub descriptor_file: String,
    /// Orchestrator blob under the simulation root
    pub simulation_blob: String,
    /// Output blob under the simulation root
    pub output_blob: String,
}

impl Default for SimulationLayout {
    fn default() -> Self {
        Self {
            work_dir: "work".to_string(),
            checkpoint_stage: "workers__xolotlWorker_3".to_string(),
            final_state_stage: "workers__ftridynWorker_2".to_string(),
            checkpoint_file: "xolotlStop.h5".to_string(),
            continuation_file: "networkFile.h5".to_string(),
            final_state_file: "last_TRIDYN.dat".to_string(),
            retention_file: "retentionOut.txt".to_string(),
            all_retention_file: "allRetentionOut.txt".to_string(),
            surface_file: "surface.txt".to_string(),
            all_surface_file: "allSurface.txt".to_string(),
            descriptor_file: "tridyn.dat".to_string(),
            simulation_blob: "simulation.json".to_string(),
            output_blob: "output.json".to_string(),
        }
    }
}

impl SimulationLayout {
    /// Checkpoint stage directory of an attempt.
    #[must_use]
    pub fn checkpoint_stage_dir(&self, attempt_dir: &Path) -> PathBuf {
        attempt_dir.join(&self.work_dir).join(&self.checkpoint_stage)
    }

    /// Final-state stage directory of an attempt.
    #[must_use]
    pub fn final_state_stage_dir(&self, attempt_dir: &Path) -> PathBuf {
        attempt_dir.join(&self.work_dir).join(&self.final_state_stage)
    }

    /// Raw checkpoint produced by the checkpoint stage.
    #[must_use]
    pub fn checkpoint_path(&self, attempt_dir: &Path) -> PathBuf {
        self.checkpoint_stage_dir(attempt_dir)
            .join(&self.checkpoint_file)
    }

    /// Truncated continuation state in the attempt root.
    #[must_use]
    pub fn continuation_path(&self, attempt_dir: &Path) -> PathBuf {
        attempt_dir.join(&self.continuation_file)
    }

    /// Final-state file as written by its sub-stage.
    #[must_use]
    pub fn final_state_source(&self, attempt_dir: &Path) -> PathBuf {
        self.final_state_stage_dir(attempt_dir)
            .join(&self.final_state_file)
    }

    /// Canonical final-state copy in the attempt root.
    #[must_use]
    pub fn final_state_copy(&self, attempt_dir: &Path) -> PathBuf {
        attempt_dir.join(&self.final_state_file)
    }
}

/// Forced defaults and thresholds applied when seeding a restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestartPolicy {
    /// Value written to the solver mode key
    pub start_mode: String,
    /// Absolute tolerance forced before log overlay
    pub absolute_tolerance: f64,
    /// Relative tolerance forced before log overlay
    pub relative_tolerance: f64,
    /// Elapsed driver time below which the step cap is kept
    pub elapsed_time_threshold: f64,
    /// Step cap forced once elapsed time reaches the threshold
    pub reduced_max_time_step: f64,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self {
            start_mode: "RESTART".to_string(),
            absolute_tolerance: 1e-3,
            relative_tolerance: 1e-3,
            elapsed_time_threshold: 5.0,
            reduced_max_time_step: 0.1,
        }
    }
}

/// Complete orchestrator configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Attempt filesystem layout
    pub layout: SimulationLayout,
    /// Restart seeding policy
    pub policy: RestartPolicy,
}

impl SimulationConfig {
    /// Create a builder starting from the defaults.
    #[must_use]
    pub fn builder() -> SimulationConfigBuilder {
        SimulationConfigBuilder::default()
    }

    /// Load a configuration from a JSON file. Missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingFile` if the file is absent, or a serialization
    /// error if it is not valid JSON.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::MissingFile(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Builder for `SimulationConfig`.
#[derive(Debug, Default)]
pub struct SimulationConfigBuilder {
    layout: SimulationLayout,
    policy: RestartPolicy,
}

impl SimulationConfigBuilder {
    /// Replace the whole layout.
    #[must_use]
    pub fn layout(mut self, layout: SimulationLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Replace the whole restart policy.
    #[must_use]
    pub fn policy(mut self, policy: RestartPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set both forced tolerances.
    #[must_use]
    pub const fn tolerances(mut self, absolute: f64, relative: f64) -> Self {
        self.policy.absolute_tolerance = absolute;
        self.policy.relative_tolerance = relative;
        self
    }

    /// Set the elapsed-time threshold and the reduced step cap.
    #[must_use]
    pub const fn step_cap(mut self, elapsed_threshold: f64, reduced: f64) -> Self {
        self.policy.elapsed_time_threshold = elapsed_threshold;
        self.policy.reduced_max_time_step = reduced;
        self
    }

    /// Build the `SimulationConfig`.
    #[must_use]
    pub fn build(self) -> SimulationConfig {
        SimulationConfig {
            layout: self.layout,
            policy: self.policy,
        }
    }
}
