//! Per-target advisory lock.
//!
//! Held for the whole of every mutating operation so two concurrent
//! invocations against the same target cannot interleave swaps or builds.
//! Non-blocking: a second process fails fast with [`ReleaseError::Locked`].

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::{io_err, ReleaseError};

/// Exclusive lock on `info/<target>/.stagehand.lock`, released on drop.
#[derive(Debug)]
pub struct TargetLock {
    path: PathBuf,
    file: File,
}

impl TargetLock {
    pub fn acquire(path: &Path) -> Result<Self, ReleaseError> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| io_err(path, e))?;

        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => {
                tracing::debug!("acquired lock {}", path.display());
                Ok(Self {
                    path: path.to_path_buf(),
                    file,
                })
            }
            Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => Err(ReleaseError::Locked {
                path: path.to_path_buf(),
            }),
            Err(e) => Err(io_err(path, e)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TargetLock {
    fn drop(&mut self) {
        if let Err(err) = FileExt::unlock(&self.file) {
            tracing::warn!("failed to release lock {}: {err}", self.path.display());
        }
    }
}
