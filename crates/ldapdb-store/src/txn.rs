//! Write transactions: lock, refresh, mutate, persist, unlock.
//!
//! A transaction holds the cross-process lock for its whole critical
//! section and re-validates the cache after acquiring it, because another
//! process may have committed between our last read and the lock.

use crate::directory::Directory;
use crate::error::StoreError;
use crate::lock::FileLock;
use crate::store::DirectoryStore;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Serializes write transactions over one snapshot across processes
#[derive(Clone)]
pub struct WriteCoordinator {
    store: Arc<Mutex<DirectoryStore>>,
    lock_path: PathBuf,
}

impl WriteCoordinator {
    /// Coordinate writes to `store` through the lock file at `lock_path`
    pub fn new(store: Arc<Mutex<DirectoryStore>>, lock_path: impl Into<PathBuf>) -> Self {
        Self {
            store,
            lock_path: lock_path.into(),
        }
    }

    /// The store this coordinator writes to
    #[must_use]
    pub const fn store(&self) -> &Arc<Mutex<DirectoryStore>> {
        &self.store
    }

    /// Lock file path
    #[must_use]
    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// Run `mutation` against a fresh copy of the directory and persist it.
    ///
    /// Blocks until the lock is available. The mutation works on a draft;
    /// if it fails, or the draft cannot be written, nothing is committed and
    /// the cached directory is left as it was. The lock is released on
    /// every path.
    pub fn run_exclusive<T, E, F>(&self, mutation: F) -> Result<T, E>
    where
        F: FnOnce(&mut Directory) -> Result<T, E>,
        E: From<StoreError> + std::fmt::Display,
    {
        let _lock = FileLock::acquire(&self.lock_path)?;
        let mut store = self.store.lock();
        store.refresh_if_stale()?;

        let mut draft = store.directory().clone();
        let value = match mutation(&mut draft) {
            Ok(value) => value,
            Err(e) => {
                debug!("Write transaction aborted: {}", e);
                return Err(e);
            }
        };

        if let Err(e) = store.commit(draft) {
            warn!(
                "Failed to persist snapshot {}: {}",
                store.path().display(),
                e
            );
            return Err(e.into());
        }
        Ok(value)
    }
}
