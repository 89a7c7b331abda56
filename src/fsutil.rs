//! Filesystem helpers

use crate::{Error, Result};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use walkdir::WalkDir;

/// Recursively copy `src` into a new directory `dst`.
///
/// Symlinks are followed and their targets copied, so the copy never shares
/// files with the source tree. `dst` must not exist yet.
///
/// # Errors
///
/// `MissingFile` if `src` is not a directory, `AlreadyExists` if `dst`
/// exists, or any IO/traversal error.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<u64> {
    if !src.is_dir() {
        return Err(Error::MissingFile(src.to_path_buf()));
    }
    if dst.exists() {
        return Err(Error::AlreadyExists(dst.to_path_buf()));
    }

    let mut bytes = 0;
    for entry in WalkDir::new(src).follow_links(true) {
        let entry = entry?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| Error::Other(format!("walked outside {}: {e}", src.display())))?;
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            bytes += fs::copy(entry.path(), &target)?;
        }
    }
    Ok(bytes)
}

/// Replace `path` with `contents` through a synced temporary file in the
/// same directory. On error the previous file is left as it was.
///
/// # Errors
///
/// Any IO error while creating, writing or renaming the temporary file.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;
    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(contents)?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}
