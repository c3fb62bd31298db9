//! Shared-memory backend
//!
//! One process, many connections, one directory in RAM. The snapshot is
//! read once at startup and written back on shutdown, but only if this
//! process changed something; nothing on disk is consulted in between.
//! Each operation holds the in-process lock only for its own duration, so
//! separate requests are not isolated from each other beyond that.

use crate::backend::{Backend, Modification, ResultSink};
use crate::filter::FilterEvaluator;
use crate::{ops, search};
use async_trait::async_trait;
use ldapdb_common::{Dn, Result, Scope};
use ldapdb_store::{Attributes, Directory, DirectoryStore};
use parking_lot::{Mutex, RwLock};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// Directory held in process memory
pub struct MemoryBackend {
    directory: RwLock<Arc<Directory>>,
    store: Option<Mutex<DirectoryStore>>,
    dirty: AtomicBool,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Create a volatile, empty backend
    #[must_use]
    pub fn new() -> Self {
        Self {
            directory: RwLock::new(Arc::new(Directory::new())),
            store: None,
            dirty: AtomicBool::new(false),
        }
    }

    /// Load the snapshot at `path` (empty if absent); [`flush`](Self::flush)
    /// writes it back
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let store = DirectoryStore::open(path)?;
        let directory = store.snapshot();
        info!(
            "Loaded {} entries from {} into memory",
            directory.len(),
            store.path().display()
        );
        Ok(Self {
            directory: RwLock::new(directory),
            store: Some(Mutex::new(store)),
            dirty: AtomicBool::new(false),
        })
    }

    /// Snapshot path, if this backend is persistent
    #[must_use]
    pub fn snapshot_path(&self) -> Option<PathBuf> {
        self.store.as_ref().map(|store| store.lock().path().to_path_buf())
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.directory.read().len()
    }

    /// Whether the directory is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.directory.read().is_empty()
    }

    /// Shared handle to the current directory
    #[must_use]
    pub fn directory(&self) -> Arc<Directory> {
        Arc::clone(&self.directory.read())
    }

    /// Persist the directory atomically, if a snapshot path is configured
    /// and something changed since the last flush.
    ///
    /// An unchanged directory is never written, so a read-only session
    /// cannot overwrite what other processes committed meanwhile.
    pub fn flush(&self) -> Result<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let mut store = store.lock();
        if !self.dirty.swap(false, Ordering::AcqRel) {
            debug!("No changes to flush to {}", store.path().display());
            return Ok(());
        }
        let directory = Directory::clone(&self.directory.read());
        if let Err(e) = store.commit(directory) {
            self.dirty.store(true, Ordering::Release);
            return Err(e.into());
        }
        info!(
            "Flushed {} entries to {}",
            store.directory().len(),
            store.path().display()
        );
        Ok(())
    }

    /// Run `mutation` against the directory, marking it dirty on success
    fn write<T>(&self, mutation: impl FnOnce(&mut Directory) -> Result<T>) -> Result<T> {
        let mut directory = self.directory.write();
        let value = mutation(Arc::make_mut(&mut *directory))?;
        self.dirty.store(true, Ordering::Release);
        Ok(value)
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    async fn search(
        &self,
        base: &str,
        scope: Scope,
        filter: &dyn FilterEvaluator,
        sink: &mut (dyn ResultSink + Send),
    ) -> Result<()> {
        let base = Dn::new(base);
        // The sink runs without the lock held, so it may call back in
        let directory = self.directory();
        let sent = search::search(&directory, &base, scope, filter, sink)?;
        debug!("Search under {} returned {} entries", base, sent);
        Ok(())
    }

    async fn add(&self, dn: &str, attributes: Attributes) -> Result<()> {
        let dn = Dn::new(dn);
        self.write(|directory| ops::add_entry(directory, dn.clone(), attributes))?;
        debug!("Added {}", dn);
        Ok(())
    }

    async fn delete(&self, dn: &str) -> Result<()> {
        let dn = Dn::new(dn);
        self.write(|directory| ops::delete_entry(directory, &dn))?;
        debug!("Deleted {}", dn);
        Ok(())
    }

    async fn modify(&self, dn: &str, changes: Vec<Modification>) -> Result<()> {
        let dn = Dn::new(dn);
        self.write(|directory| ops::modify_entry(directory, &dn, &changes))?;
        debug!("Modified {} ({} changes)", dn, changes.len());
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        self.flush()
    }
}
