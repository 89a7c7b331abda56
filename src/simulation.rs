//! Restart orchestration for a multi-attempt simulation
//!
//! A [`Simulation`] owns the chronological sequence of attempts. An
//! external loop calls [`Simulation::step`] repeatedly:
//!
//! ```text
//! step(): not started ──> start()    init_<base>/
//!         time limit  ──> restart()  restart_<base>_<n>/  (copy of the previous attempt)
//!         otherwise   ──> nothing    (caller inspects status())
//! ```
//!
//! Restarts follow a copy-then-mutate discipline: the previous attempt's
//! directory is copied first and only the copy is touched. A new attempt is
//! committed to the sequence only after it was submitted, so a failed restart
//! leaves the orchestrator exactly as it was.

use crate::checkpoint::{copy_final_state, truncate_checkpoint, CheckpointTruncator};
use crate::config::SimulationConfig;
use crate::extract::LogParameterExtractor;
use crate::fsutil::{copy_tree, write_atomic};
use crate::params::keys;
use crate::run::{AttemptKind, AttemptRecord, RunHandle};
use crate::status::{display_name, SimulationStatus, StatusReport};
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What a single [`Simulation::step`] tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Submitted the initial attempt.
    Started,
    /// Submitted restart number `n`.
    Restarted(usize),
    /// Nothing to do this tick.
    Idle,
}

/// Multi-attempt simulation driven by external polling.
pub struct Simulation<R: RunHandle> {
    basename: String,
    root: PathBuf,
    name: String,
    current: R,
    retired: Vec<R>,
    history: Vec<AttemptRecord>,
    config: SimulationConfig,
    truncator: Arc<dyn CheckpointTruncator>,
}

impl<R: RunHandle> Simulation<R> {
    /// Create a simulation around a template attempt using the default config.
    ///
    /// The template's working directory becomes the simulation root and its
    /// last path component the base name.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidState` if the working directory has no name.
    pub fn new(template: R, truncator: impl CheckpointTruncator + 'static) -> Result<Self> {
        Self::with_config(template, Arc::new(truncator), SimulationConfig::default())
    }

    /// Create a simulation with an explicit config and shared truncator.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidState` if the working directory has no name.
    pub fn with_config(
        template: R,
        truncator: Arc<dyn CheckpointTruncator>,
        config: SimulationConfig,
    ) -> Result<Self> {
        let root = template.work_dir().to_path_buf();
        let basename = root
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                Error::InvalidState(format!(
                    "simulation root {} has no usable directory name",
                    root.display()
                ))
            })?
            .to_string();
        Ok(Self {
            name: basename.clone(),
            basename,
            root,
            current: template,
            retired: Vec::new(),
            history: Vec::new(),
            config,
            truncator,
        })
    }

    /// Base name, fixed at construction.
    #[must_use]
    pub fn basename(&self) -> &str {
        &self.basename
    }

    /// Simulation root directory holding every attempt.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Name of the current attempt (`init_<base>`, `restart_<base>_<n>`, or the
    /// base name before start).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Current (latest) attempt. Before start this is the template.
    #[must_use]
    pub const fn current(&self) -> &R {
        &self.current
    }

    /// Submitted attempts in chronological order. Empty before start.
    pub fn attempts(&self) -> impl Iterator<Item = &R> {
        let current = (!self.history.is_empty()).then_some(&self.current);
        self.retired.iter().chain(current)
    }

    /// Number of submitted attempts.
    #[must_use]
    pub fn attempt_count(&self) -> usize {
        self.history.len()
    }

    /// Submission records, parallel to [`attempts`](Self::attempts).
    #[must_use]
    pub fn history(&self) -> &[AttemptRecord] {
        &self.history
    }

    /// Submit the initial attempt into `<root>/init_<base>`.
    ///
    /// # Errors
    ///
    /// `InvalidState` if an attempt was already submitted; errors from the
    /// attempt's `write_files`/`start` propagate.
    pub fn start(&mut self) -> Result<()> {
        if !self.history.is_empty() {
            return Err(Error::InvalidState(format!(
                "{} was already started; use restart() to continue it",
                self.basename
            )));
        }
        let name = format!("init_{}", self.basename);
        let work_dir = self.root.join(&name);
        info!(simulation = %self.basename, work_dir = %work_dir.display(), "starting simulation");

        self.current.change_work_dir(work_dir.clone());
        self.current.write_files(false)?;
        self.current.start()?;

        self.history
            .push(AttemptRecord::new(name.clone(), AttemptKind::Init, work_dir));
        self.name = name;
        Ok(())
    }

    /// Continue a time-limited attempt in a fresh copy of its directory.
    ///
    /// Steps, in order: copy the working directory to
    /// `<root>/restart_<base>_<n>` (`n` = attempts recorded so far), bind a
    /// new attempt to it with a clone of the parameters and the same batch
    /// descriptor, prepare continuation state, rewrite inputs, clean, submit,
    /// and finally append the attempt.
    ///
    /// # Errors
    ///
    /// `InvalidState` if nothing was started or the current attempt did not
    /// exceed its time limit; `AlreadyExists` if the destination exists (it is
    /// left alone); any error from the copy or continuation preparation. On
    /// those errors the copy, partial or complete, is removed and the
    /// orchestrator is unchanged.
    pub fn restart(&mut self) -> Result<()> {
        if self.history.is_empty() {
            return Err(Error::InvalidState(format!(
                "{} has not been started; call start() first",
                self.basename
            )));
        }
        if !self.current.has_exceeded_time_limit() {
            return Err(Error::InvalidState(format!(
                "{} {}; only attempts that exceeded the time limit are restarted",
                self.display_name(),
                SimulationStatus::of(&self.current)
            )));
        }

        let ordinal = self.history.len();
        let name = format!("restart_{}_{ordinal}", self.basename);
        let src = self.current.work_dir().to_path_buf();
        let dest = self.root.join(&name);
        info!(
            simulation = %self.basename,
            ordinal,
            from = %src.display(),
            to = %dest.display(),
            "restarting simulation"
        );

        if dest.exists() {
            return Err(Error::AlreadyExists(dest));
        }
        let seeded = copy_tree(&src, &dest).and_then(|bytes| {
            debug!(bytes, "copied previous attempt");
            self.seed_attempt(dest.clone())
        });
        let next = match seeded {
            Ok(next) => next,
            Err(e) => {
                warn!(error = %e, work_dir = %dest.display(), "restart aborted, removing copy");
                if dest.exists() {
                    if let Err(cleanup) = fs::remove_dir_all(&dest) {
                        warn!(error = %cleanup, "failed to remove aborted restart directory");
                    }
                }
                return Err(e);
            }
        };

        let prior = std::mem::replace(&mut self.current, next);
        self.retired.push(prior);
        self.history.push(AttemptRecord::new(
            name.clone(),
            AttemptKind::Restart(ordinal),
            dest,
        ));
        self.name = name;
        Ok(())
    }

    fn seed_attempt(&self, work_dir: PathBuf) -> Result<R> {
        let mut next = R::from_parts(
            work_dir,
            self.current.parameters().clone(),
            self.current.batch().clone(),
        );
        self.prepare_continuation(&mut next)?;
        next.write_files(true)?;
        next.clean()?;
        next.start()?;
        Ok(next)
    }

    fn prepare_continuation(&self, next: &mut R) -> Result<()> {
        let layout = &self.config.layout;
        let dir = next.work_dir().to_path_buf();

        truncate_checkpoint(
            self.truncator.as_ref(),
            &layout.checkpoint_path(&dir),
            &layout.continuation_path(&dir),
        )?;
        debug!("continuation state written");

        copy_final_state(
            &layout.final_state_source(&dir),
            &layout.final_state_copy(&dir),
        )?;
        debug!("final state copied");

        let policy = &self.config.policy;
        let store = next.parameters_mut();
        store.set(keys::START_MODE, policy.start_mode.as_str());
        store.set(keys::TS_ATOL, policy.absolute_tolerance);
        store.set(keys::TS_RTOL, policy.relative_tolerance);

        let log = self.current.log_lines()?;
        let continuation = LogParameterExtractor::new(policy).extract(&log, next.parameters())?;
        info!(
            loop_count = continuation.loop_count,
            elapsed_time = continuation.elapsed_time,
            max_time_step = %continuation.max_time_step,
            "continuation parameters recovered from log"
        );
        next.parameters_mut().merge(continuation.entries());
        Ok(())
    }

    /// Current attempt was submitted.
    #[must_use]
    pub fn has_started(&self) -> bool {
        self.current.has_started()
    }

    /// Current attempt is waiting in the queue.
    #[must_use]
    pub fn is_queueing(&self) -> bool {
        self.current.is_queueing()
    }

    /// Current attempt is executing.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.current.is_running()
    }

    /// Current attempt was killed for exceeding its time limit.
    #[must_use]
    pub fn has_exceeded_time_limit(&self) -> bool {
        self.current.has_exceeded_time_limit()
    }

    /// Current attempt completed normally.
    #[must_use]
    pub fn has_finished(&self) -> bool {
        self.current.has_finished()
    }

    /// Current attempt ended with another error.
    #[must_use]
    pub fn has_failed(&self) -> bool {
        self.current.has_failed()
    }

    /// `<base>`, `<base> (init)` or `<base> (restart n)`.
    #[must_use]
    pub fn display_name(&self) -> String {
        display_name(&self.basename, &self.name)
    }

    /// Collapsed status of the current attempt.
    #[must_use]
    pub fn status(&self) -> StatusReport {
        StatusReport {
            display_name: self.display_name(),
            status: SimulationStatus::of(&self.current),
        }
    }

    /// Status as a single line, e.g. `he_flux (restart 2) is running`.
    #[must_use]
    pub fn status_line(&self) -> String {
        self.status().to_string()
    }

    /// Log the status line.
    pub fn print_status(&self) {
        info!("{}", self.status_line());
    }

    /// One non-blocking tick of the external polling loop.
    ///
    /// Starts a fresh simulation, restarts a time-limited one, and otherwise
    /// does nothing. Completion is never signalled here; check
    /// [`status`](Self::status) to stop polling.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`start`](Self::start) and
    /// [`restart`](Self::restart).
    pub fn step(&mut self) -> Result<StepOutcome> {
        if self.history.is_empty() {
            self.start()?;
            Ok(StepOutcome::Started)
        } else if self.current.has_exceeded_time_limit() {
            self.restart()?;
            Ok(StepOutcome::Restarted(self.history.len() - 1))
        } else {
            Ok(StepOutcome::Idle)
        }
    }

    /// Location of the persisted orchestrator state.
    #[must_use]
    pub fn blob_path(&self) -> PathBuf {
        self.root.join(&self.config.layout.simulation_blob)
    }
}

#[derive(Serialize)]
struct SnapshotRef<'a, R> {
    basename: &'a str,
    root: &'a Path,
    name: &'a str,
    current: &'a R,
    retired: &'a [R],
    history: &'a [AttemptRecord],
    config: &'a SimulationConfig,
}

#[derive(Deserialize)]
struct Snapshot<R> {
    basename: String,
    root: PathBuf,
    name: String,
    current: R,
    retired: Vec<R>,
    history: Vec<AttemptRecord>,
    config: SimulationConfig,
}

impl<R> Simulation<R>
where
    R: RunHandle + Serialize + DeserializeOwned,
{
    /// Persist the orchestrator state to [`blob_path`](Self::blob_path).
    ///
    /// The truncation strategy is not persisted.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` if the file exists and `overwrite` is false, or
    /// IO/serialization errors. The previous file survives any error.
    pub fn save(&self, overwrite: bool) -> Result<PathBuf> {
        let path = self.blob_path();
        if path.is_file() && !overwrite {
            return Err(Error::AlreadyExists(path));
        }
        let snapshot = SnapshotRef {
            basename: &self.basename,
            root: &self.root,
            name: &self.name,
            current: &self.current,
            retired: &self.retired,
            history: &self.history,
            config: &self.config,
        };
        let json = serde_json::to_string_pretty(&snapshot)?;
        write_atomic(&path, json.as_bytes())?;
        info!(path = %path.display(), attempts = self.history.len(), "simulation saved");
        Ok(path)
    }

    /// Load a persisted simulation, re-injecting the truncation strategy.
    ///
    /// # Errors
    ///
    /// `MissingFile` if `path` is absent, or IO/serialization errors.
    pub fn load<P: AsRef<Path>>(path: P, truncator: Arc<dyn CheckpointTruncator>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::MissingFile(path.to_path_buf()));
        }
        let snapshot: Snapshot<R> = serde_json::from_str(&fs::read_to_string(path)?)?;
        debug!(path = %path.display(), attempts = snapshot.history.len(), "simulation loaded");
        Ok(Self {
            basename: snapshot.basename,
            root: snapshot.root,
            name: snapshot.name,
            current: snapshot.current,
            retired: snapshot.retired,
            history: snapshot.history,
            config: snapshot.config,
            truncator,
        })
    }
}

impl<R: RunHandle + fmt::Debug> fmt::Debug for Simulation<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("basename", &self.basename)
            .field("root", &self.root)
            .field("name", &self.name)
            .field("current", &self.current)
            .field("retired", &self.retired)
            .field("history", &self.history)
            .finish_non_exhaustive()
    }
}
