//! Process-local cache of the persisted directory.
//!
//! Each worker process owns one `DirectoryStore`. Before reading the cached
//! directory an operation calls [`DirectoryStore::refresh_if_stale`], which
//! costs a single `stat` when nothing changed and a full re-read when
//! another process has replaced the snapshot.

use crate::directory::Directory;
use crate::error::StoreResult;
use crate::snapshot::{self, FreshnessToken, SnapshotFile};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// What the cache knows about the file it was loaded from
#[derive(Debug)]
enum Freshness {
    /// Never loaded, or explicitly invalidated
    Unloaded,
    /// Loaded while no snapshot file existed
    Missing,
    /// Loaded from (or written to) this file, which stays open
    Present(SnapshotFile),
}

impl Freshness {
    fn matches(&self, current: Option<FreshnessToken>) -> bool {
        match (self, current) {
            (Self::Missing, None) => true,
            (Self::Present(cached), Some(current)) => cached.token() == current,
            _ => false,
        }
    }
}

/// Cached directory plus the freshness token it was loaded with
pub struct DirectoryStore {
    path: PathBuf,
    directory: Arc<Directory>,
    freshness: Freshness,
}

impl DirectoryStore {
    /// Create an unloaded store for the snapshot at `path`.
    ///
    /// The first [`refresh_if_stale`](Self::refresh_if_stale) loads it.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            directory: Arc::new(Directory::new()),
            freshness: Freshness::Unloaded,
        }
    }

    /// Create a store and load the snapshot immediately
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let mut store = Self::new(path);
        store.load()?;
        Ok(store)
    }

    /// Snapshot path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the cache has been populated since creation or invalidation
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        !matches!(self.freshness, Freshness::Unloaded)
    }

    /// Read the snapshot unconditionally, replacing the cached directory.
    ///
    /// A missing file yields an empty directory.
    pub fn load(&mut self) -> StoreResult<()> {
        match snapshot::read(&self.path)? {
            Some((directory, file)) => {
                debug!(
                    "Loaded {} entries from {}",
                    directory.len(),
                    self.path.display()
                );
                self.directory = Arc::new(directory);
                self.freshness = Freshness::Present(file);
            }
            None => {
                debug!("No snapshot at {}, starting empty", self.path.display());
                self.directory = Arc::new(Directory::new());
                self.freshness = Freshness::Missing;
            }
        }
        Ok(())
    }

    /// Reload if the on-disk snapshot differs from the cached one.
    ///
    /// Returns whether a reload happened.
    pub fn refresh_if_stale(&mut self) -> StoreResult<bool> {
        if self.is_loaded() {
            let current = FreshnessToken::probe(&self.path)?;
            if self.freshness.matches(current) {
                return Ok(false);
            }
            debug!("Snapshot {} changed on disk", self.path.display());
        }
        self.load()?;
        Ok(true)
    }

    /// Forget the freshness token so the next refresh re-reads the file
    pub fn invalidate(&mut self) {
        self.freshness = Freshness::Unloaded;
    }

    /// Shared handle to the cached directory
    #[must_use]
    pub fn snapshot(&self) -> Arc<Directory> {
        Arc::clone(&self.directory)
    }

    /// The cached directory
    #[must_use]
    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    /// Persist `directory` and, once it is on disk, make it the cached one.
    ///
    /// The freshness token comes from the file just written, so our own
    /// write never looks stale. On failure the cache keeps its previous
    /// contents and token.
    pub fn commit(&mut self, directory: Directory) -> StoreResult<()> {
        let file = snapshot::write(&self.path, &directory)?;
        info!(
            "Persisted {} entries to {}",
            directory.len(),
            self.path.display()
        );
        self.directory = Arc::new(directory);
        self.freshness = Freshness::Present(file);
        Ok(())
    }
}
