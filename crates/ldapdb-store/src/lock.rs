//! Cross-process exclusive lock on a companion lock file.
//!
//! Uses `flock(2)`, which is tied to the open file description: separate
//! opens of the same path conflict whether they come from different
//! processes or different threads of one process, and the kernel drops the
//! lock when the holder exits.

use crate::error::{StoreError, StoreResult};
use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Held exclusive lock; released on drop
pub struct FileLock {
    _flock: Flock<File>,
    path: PathBuf,
}

impl FileLock {
    /// Block until the exclusive lock on `path` is acquired.
    ///
    /// There is no timeout and no fairness between waiters.
    pub fn acquire(path: &Path) -> StoreResult<Self> {
        let mut file = open_lock_file(path)?;
        loop {
            match Flock::lock(file, FlockArg::LockExclusive) {
                Ok(flock) => {
                    debug!("Acquired lock {}", path.display());
                    return Ok(Self {
                        _flock: flock,
                        path: path.to_path_buf(),
                    });
                }
                // Interrupted by a signal while waiting
                Err((f, Errno::EINTR)) => file = f,
                Err((_, errno)) => return Err(lock_error(path, errno)),
            }
        }
    }

    /// Acquire the lock only if nobody holds it
    pub fn try_acquire(path: &Path) -> StoreResult<Option<Self>> {
        let file = open_lock_file(path)?;
        match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
            Ok(flock) => Ok(Some(Self {
                _flock: flock,
                path: path.to_path_buf(),
            })),
            Err((_, errno)) if errno == Errno::EWOULDBLOCK => Ok(None),
            Err((_, errno)) => Err(lock_error(path, errno)),
        }
    }

    /// Path of the lock file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        debug!("Released lock {}", self.path.display());
    }
}

fn open_lock_file(path: &Path) -> StoreResult<File> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    // The content is never read; only the handle matters
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;
    Ok(file)
}

fn lock_error(path: &Path, errno: Errno) -> StoreError {
    StoreError::Lock {
        path: path.display().to_string(),
        errno,
    }
}
