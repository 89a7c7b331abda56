//! Checkpoint continuation service
//!
//! A restart needs a checkpoint holding only the last complete timestep.
//! Producing it is the job of an external tool; the orchestrator receives
//! the tool as a strategy at construction so nothing here depends on the
//! cluster environment.

use crate::{Error, Result};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Reduces a raw checkpoint to its last complete timestep.
pub trait CheckpointTruncator: Send + Sync {
    /// Write a reduced copy of `src` to `dest`.
    ///
    /// # Errors
    ///
    /// Must fail visibly if `src` is absent or unreadable.
    fn keep_last_timestep(&self, src: &Path, dest: &Path) -> Result<()>;
}

impl<F> CheckpointTruncator for F
where
    F: Fn(&Path, &Path) -> Result<()> + Send + Sync,
{
    fn keep_last_timestep(&self, src: &Path, dest: &Path) -> Result<()> {
        self(src, dest)
    }
}

/// Runs an external program as `<program> <args...> <src> <dest>`.
///
/// ```rust
/// use ftx_campaign::checkpoint::CommandTruncator;
///
/// let truncator = CommandTruncator::new("python3")
///     .arg("/opt/coupling/keepLastTS.py");
/// assert_eq!(truncator.program().to_str(), Some("python3"));
/// ```
#[derive(Debug, Clone)]
pub struct CommandTruncator {
    program: PathBuf,
    args: Vec<OsString>,
}

impl CommandTruncator {
    /// Create a truncator invoking `program`.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append a leading argument, placed before the source and destination.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Program that will be invoked.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl CheckpointTruncator for CommandTruncator {
    fn keep_last_timestep(&self, src: &Path, dest: &Path) -> Result<()> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(src)
            .arg(dest)
            .output()
            .map_err(|e| {
                Error::Truncation(format!("failed to launch {}: {e}", self.program.display()))
            })?;
        if !output.status.success() {
            return Err(Error::Truncation(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        if !dest.is_file() {
            return Err(Error::Truncation(format!(
                "{} did not produce {}",
                self.program.display(),
                dest.display()
            )));
        }
        Ok(())
    }
}

/// Replace `dest` with the last-timestep reduction of `src`.
///
/// # Errors
///
/// Returns `Error::MissingFile` if `src` is absent; truncator errors propagate.
pub fn truncate_checkpoint(
    truncator: &dyn CheckpointTruncator,
    src: &Path,
    dest: &Path,
) -> Result<()> {
    if !src.is_file() {
        return Err(Error::MissingFile(src.to_path_buf()));
    }
    if dest.is_file() {
        debug!(path = %dest.display(), "removing stale continuation state");
        fs::remove_file(dest)?;
    }
    truncator.keep_last_timestep(src, dest)
}

/// Copy the final-state output of one sub-stage to its canonical place.
///
/// # Errors
///
/// Returns `Error::MissingFile` if `src` is absent.
pub fn copy_final_state(src: &Path, dest: &Path) -> Result<()> {
    if !src.is_file() {
        return Err(Error::MissingFile(src.to_path_buf()));
    }
    fs::copy(src, dest)?;
    Ok(())
}
