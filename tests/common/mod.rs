//! Filesystem-backed attempt double shared by the integration tests
//!
//! Scheduler state lives in `<work_dir>/.phase`, the solver log in
//! `<work_dir>/ftx.log`, so tests drive an attempt by writing files the same
//! way a real job would.

#![allow(dead_code)]

use ftx_campaign::params::{keys, ParameterStore};
use ftx_campaign::run::RunHandle;
use ftx_campaign::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const PHASE_FILE: &str = ".phase";
pub const LOG_FILE: &str = "ftx.log";
pub const INPUT_FILE: &str = "input.json";
pub const STAGE_DIR: &str = "work/workers__xolotlWorker_3";
pub const FINAL_STAGE_DIR: &str = "work/workers__ftridynWorker_2";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Queued,
    Running,
    TimedOut,
    Finished,
    Failed,
}

impl Phase {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::TimedOut => "timeout",
            Self::Finished => "finished",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub account: String,
    pub walltime: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FakeRun {
    work_dir: PathBuf,
    parameters: ParameterStore,
    batch: Batch,
}

impl FakeRun {
    fn phase(&self) -> Option<String> {
        fs::read_to_string(self.work_dir.join(PHASE_FILE))
            .ok()
            .map(|s| s.trim().to_string())
    }

    fn is(&self, phase: Phase) -> bool {
        self.phase().as_deref() == Some(phase.as_str())
    }
}

impl RunHandle for FakeRun {
    type Batch = Batch;

    fn from_parts(work_dir: PathBuf, parameters: ParameterStore, batch: Batch) -> Self {
        Self {
            work_dir,
            parameters,
            batch,
        }
    }

    fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    fn change_work_dir(&mut self, work_dir: PathBuf) {
        self.work_dir = work_dir;
    }

    fn write_files(&mut self, overwrite: bool) -> Result<()> {
        fs::create_dir_all(&self.work_dir)?;
        let input = self.work_dir.join(INPUT_FILE);
        if input.exists() && !overwrite {
            return Err(Error::AlreadyExists(input));
        }
        fs::write(input, serde_json::to_string_pretty(&self.parameters)?)?;
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        if self.phase().is_some() {
            return Err(Error::InvalidState("attempt already submitted".into()));
        }
        set_phase(&self.work_dir, Phase::Queued);
        Ok(())
    }

    fn clean(&mut self) -> Result<()> {
        let phase = self.work_dir.join(PHASE_FILE);
        if phase.exists() {
            fs::remove_file(phase)?;
        }
        Ok(())
    }

    fn has_started(&self) -> bool {
        self.phase().is_some()
    }

    fn is_queueing(&self) -> bool {
        self.is(Phase::Queued)
    }

    fn is_running(&self) -> bool {
        self.is(Phase::Running)
    }

    fn has_exceeded_time_limit(&self) -> bool {
        self.is(Phase::TimedOut)
    }

    fn has_finished(&self) -> bool {
        self.is(Phase::Finished)
    }

    fn has_failed(&self) -> bool {
        self.is(Phase::Failed)
    }

    fn log_lines(&self) -> Result<Vec<String>> {
        let path = self.work_dir.join(LOG_FILE);
        if !path.is_file() {
            return Err(Error::MissingFile(path));
        }
        Ok(fs::read_to_string(path)?.lines().map(str::to_string).collect())
    }

    fn parameters(&self) -> &ParameterStore {
        &self.parameters
    }

    fn parameters_mut(&mut self) -> &mut ParameterStore {
        &mut self.parameters
    }

    fn batch(&self) -> &Batch {
        &self.batch
    }
}

pub fn set_phase(dir: &Path, phase: Phase) {
    fs::write(dir.join(PHASE_FILE), phase.as_str()).unwrap();
}

/// Template attempt rooted at `<parent>/<name>`.
pub fn template(parent: &Path, name: &str) -> FakeRun {
    let mut parameters = ParameterStore::new();
    parameters.set(keys::START_MODE, "INIT");
    parameters.set(keys::TS_ATOL, 1e-6);
    parameters.set(keys::TS_RTOL, 1e-6);
    parameters.set(keys::XOLOTL_MAX_TS, 0.5);
    FakeRun::from_parts(
        parent.join(name),
        parameters,
        Batch {
            account: "m1709".into(),
            walltime: "02:00:00".into(),
        },
    )
}

/// Solver log ending with the given elapsed driver time.
pub fn solver_log(loop_count: i64, elapsed: f64) -> String {
    format!(
        "starting driver\n\
         driver time (in loop) 0.5\n\
         coupling loop {loop_count}: check for updates in time steps\n\
         no update (0.05) (1.23)\n\
         change in Xolotls\n\
         max dt 0.2\n\
         driver time (in loop) {elapsed}\n"
    )
}

/// Write everything a time-limited attempt leaves behind.
pub fn leave_outputs(dir: &Path, log: &str) {
    fs::create_dir_all(dir.join(STAGE_DIR)).unwrap();
    fs::create_dir_all(dir.join(FINAL_STAGE_DIR)).unwrap();
    fs::write(dir.join(STAGE_DIR).join("xolotlStop.h5"), b"ts0 ts1 ts2").unwrap();
    fs::write(dir.join(FINAL_STAGE_DIR).join("last_TRIDYN.dat"), b"He 0.93").unwrap();
    fs::write(dir.join(LOG_FILE), log).unwrap();
}

/// Truncator double: keeps the last whitespace-separated "timestep".
pub fn keep_last_word(src: &Path, dest: &Path) -> Result<()> {
    let text = fs::read_to_string(src)?;
    let last = text.split_whitespace().last().unwrap_or_default();
    fs::write(dest, last)?;
    Ok(())
}

/// Every file below `dir` with its contents, sorted by path.
pub fn snapshot(dir: &Path) -> Vec<(PathBuf, Vec<u8>)> {
    let mut files: Vec<(PathBuf, Vec<u8>)> = walkdir::WalkDir::new(dir)
        .into_iter()
        .map(|entry| entry.unwrap())
        .filter(|e| e.file_type().is_file())
        .map(|e| (e.path().to_path_buf(), fs::read(e.path()).unwrap()))
        .collect();
    files.sort();
    files
}
