//! File-backed backend for multi-process deployments
//!
//! Every worker process opens its own `FileBackend` over the same snapshot
//! and lock files. Searches revalidate the process cache and read without
//! locking; writes run as [`WriteCoordinator`] transactions. All blocking
//! work happens on tokio's blocking pool, so a task waiting for another
//! process to release the lock is suspended rather than spinning.

use crate::backend::{Backend, Modification, ResultSink};
use crate::filter::FilterEvaluator;
use crate::{ops, search};
use async_trait::async_trait;
use ldapdb_common::config::{BackendConfig, default_lock_path};
use ldapdb_common::{Dn, Error, Result, Scope};
use ldapdb_store::{Attributes, Directory, DirectoryStore, WriteCoordinator};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Directory shared with other processes through a snapshot file
pub struct FileBackend {
    store: Arc<Mutex<DirectoryStore>>,
    coordinator: WriteCoordinator,
}

impl FileBackend {
    /// Create a backend; the snapshot is loaded on first use
    pub fn new(snapshot_path: impl Into<PathBuf>, lock_path: impl Into<PathBuf>) -> Self {
        let store = Arc::new(Mutex::new(DirectoryStore::new(snapshot_path)));
        let coordinator = WriteCoordinator::new(Arc::clone(&store), lock_path);
        Self { store, coordinator }
    }

    /// Create a backend using the default lock path next to the snapshot
    pub fn with_snapshot(snapshot_path: impl Into<PathBuf>) -> Self {
        let snapshot_path = snapshot_path.into();
        let lock_path = default_lock_path(&snapshot_path);
        Self::new(snapshot_path, lock_path)
    }

    /// Create a backend from configuration and load the snapshot now, so
    /// an unreadable snapshot is reported at startup
    pub fn open(config: &BackendConfig) -> Result<Self> {
        let backend = Self::new(config.snapshot_path.clone(), config.lock_path());
        let entries = {
            let mut store = backend.store.lock();
            store.load()?;
            store.directory().len()
        };
        info!(
            "Opened snapshot {} ({} entries), lock {}",
            config.snapshot_path.display(),
            entries,
            backend.coordinator.lock_path().display()
        );
        Ok(backend)
    }

    /// Snapshot path
    #[must_use]
    pub fn snapshot_path(&self) -> PathBuf {
        self.store.lock().path().to_path_buf()
    }

    /// Lock file path
    #[must_use]
    pub fn lock_path(&self) -> &Path {
        self.coordinator.lock_path()
    }

    /// Refresh the cache and return the directory as of now
    pub async fn current(&self) -> Result<Arc<Directory>> {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || -> Result<Arc<Directory>> {
            let mut store = store.lock();
            if store.refresh_if_stale()? {
                debug!("Reloaded snapshot {}", store.path().display());
            }
            Ok(store.snapshot())
        })
        .await
        .map_err(|e| Error::internal(format!("join error in refresh: {e}")))?
    }

    /// Run `mutation` as a write transaction on the blocking pool
    async fn transaction<T, F>(&self, mutation: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Directory) -> Result<T> + Send + 'static,
    {
        let coordinator = self.coordinator.clone();
        tokio::task::spawn_blocking(move || coordinator.run_exclusive(mutation))
            .await
            .map_err(|e| Error::internal(format!("join error in write transaction: {e}")))?
    }
}

#[async_trait]
impl Backend for FileBackend {
    fn name(&self) -> &str {
        "file"
    }

    async fn search(
        &self,
        base: &str,
        scope: Scope,
        filter: &dyn FilterEvaluator,
        sink: &mut (dyn ResultSink + Send),
    ) -> Result<()> {
        let base = Dn::new(base);
        let directory = self.current().await?;
        let sent = search::search(&directory, &base, scope, filter, sink)?;
        debug!("Search under {} returned {} entries", base, sent);
        Ok(())
    }

    async fn add(&self, dn: &str, attributes: Attributes) -> Result<()> {
        let dn = Dn::new(dn);
        let target = dn.clone();
        self.transaction(move |directory| ops::add_entry(directory, target, attributes))
            .await?;
        debug!("Added {}", dn);
        Ok(())
    }

    async fn delete(&self, dn: &str) -> Result<()> {
        let dn = Dn::new(dn);
        let target = dn.clone();
        self.transaction(move |directory| ops::delete_entry(directory, &target).map(drop))
            .await?;
        debug!("Deleted {}", dn);
        Ok(())
    }

    async fn modify(&self, dn: &str, changes: Vec<Modification>) -> Result<()> {
        let dn = Dn::new(dn);
        let target = dn.clone();
        let count = changes.len();
        self.transaction(move |directory| ops::modify_entry(directory, &target, &changes))
            .await?;
        debug!("Modified {} ({} changes)", dn, count);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SearchResults;
    use crate::filter::Filter;
    use ldapdb_store::FileLock;
    use std::time::Duration;
    use tempfile::tempdir;

    fn attrs(pairs: &[(&str, &[&str])]) -> Attributes {
        pairs
            .iter()
            .map(|(k, vs)| ((*k).to_string(), vs.iter().map(|v| (*v).to_string()).collect()))
            .collect()
    }

    async fn read_back(path: &Path, dn: &str) -> Option<ldapdb_store::Entry> {
        let fresh = FileBackend::with_snapshot(path);
        fresh.current().await.unwrap().get(&Dn::new(dn)).cloned()
    }

    #[tokio::test]
    async fn test_add_then_duplicate() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ldapdb.json");
        let backend = FileBackend::with_snapshot(&path);

        backend
            .add("dc=example,dc=com", attrs(&[("objectClass", &["domain"])]))
            .await
            .unwrap();
        let err = backend
            .add("dc=example,dc=com", attrs(&[("objectClass", &["domain"])]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EntryAlreadyExists { .. }));
        assert!(read_back(&path, "dc=example,dc=com").await.is_some());
    }

    #[tokio::test]
    async fn test_modify_replace() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ldapdb.json");
        let backend = FileBackend::with_snapshot(&path);

        backend
            .add(
                "cn=bob,dc=example,dc=com",
                attrs(&[("cn", &["bob"]), ("mail", &["bob@x.com", "old@x.com"])]),
            )
            .await
            .unwrap();
        backend
            .modify(
                "cn=bob,dc=example,dc=com",
                vec![Modification::replace("mail", ["bob@x.com"])],
            )
            .await
            .unwrap();

        let entry = read_back(&path, "cn=bob,dc=example,dc=com").await.unwrap();
        assert_eq!(entry.get("mail"), ["bob@x.com"]);
        assert_eq!(entry.get("cn"), ["bob"]);
    }

    #[tokio::test]
    async fn test_delete_missing_leaves_snapshot_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ldapdb.json");
        let backend = FileBackend::with_snapshot(&path);
        backend
            .add("cn=bob,dc=example", attrs(&[("cn", &["bob"])]))
            .await
            .unwrap();
        let before = std::fs::read(&path).unwrap();
        let token = ldapdb_store::FreshnessToken::probe(&path).unwrap();

        let err = backend.delete("cn=nobody,dc=example").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(std::fs::read(&path).unwrap(), before);
        assert_eq!(ldapdb_store::FreshnessToken::probe(&path).unwrap(), token);
        // The lock is not left held
        assert!(FileLock::try_acquire(backend.lock_path()).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_case_insensitive_delete() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ldapdb.json");
        let backend = FileBackend::with_snapshot(&path);

        backend
            .add("CN=Bob,DC=Example", attrs(&[("cn", &["Bob"])]))
            .await
            .unwrap();
        backend.delete("cn=bob,dc=example").await.unwrap();
        assert!(backend.current().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_modify_missing_persists_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ldapdb.json");
        let backend = FileBackend::with_snapshot(&path);

        let err = backend
            .modify("cn=ghost", vec![Modification::add("cn", ["ghost"])])
            .await
            .unwrap_err();
        assert_eq!(err.result_code(), 32);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_search_sees_other_process_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ldapdb.json");
        let a = FileBackend::with_snapshot(&path);
        let b = FileBackend::with_snapshot(&path);

        // b warms its cache with the empty directory
        let mut results = SearchResults::new();
        b.search("", Scope::WholeSubtree, &Filter::Any, &mut results)
            .await
            .unwrap();
        assert!(results.is_empty());

        a.add("cn=bob,dc=example,dc=com", attrs(&[("cn", &["bob"])]))
            .await
            .unwrap();

        let mut results = SearchResults::new();
        b.search(
            "cn=bob,dc=example,dc=com",
            Scope::BaseObject,
            &Filter::Any,
            &mut results,
        )
        .await
        .unwrap();
        assert_eq!(results.dns(), vec!["cn=bob,dc=example,dc=com"]);
    }

    #[tokio::test]
    async fn test_write_sees_other_process_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ldapdb.json");
        let a = FileBackend::with_snapshot(&path);
        let b = FileBackend::with_snapshot(&path);

        a.add("cn=bob", attrs(&[("cn", &["bob"])])).await.unwrap();
        b.current().await.unwrap();
        a.modify("cn=bob", vec![Modification::add("mail", ["bob@x.com"])])
            .await
            .unwrap();

        // b's cached copy predates the mail value; the transaction must refresh
        b.modify("cn=bob", vec![Modification::add("sn", ["builder"])])
            .await
            .unwrap();

        let entry = read_back(&path, "cn=bob").await.unwrap();
        assert_eq!(entry.get("mail"), ["bob@x.com"]);
        assert_eq!(entry.get("sn"), ["builder"]);
    }

    #[tokio::test]
    async fn test_add_conflict_detected_after_refresh() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ldapdb.json");
        let a = FileBackend::with_snapshot(&path);
        let b = FileBackend::with_snapshot(&path);
        b.current().await.unwrap();

        a.add("cn=bob", Attributes::new()).await.unwrap();
        let err = b.add("CN=BOB", Attributes::new()).await.unwrap_err();
        assert!(matches!(err, Error::EntryAlreadyExists { .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_writer_waits_for_lock() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ldapdb.json");
        let backend = Arc::new(FileBackend::with_snapshot(&path));

        // Another "process" holds the lock
        let held = FileLock::acquire(backend.lock_path()).unwrap();

        let writer = {
            let backend = Arc::clone(&backend);
            tokio::spawn(async move { backend.add("cn=bob", Attributes::new()).await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!writer.is_finished());
        assert!(!path.exists());

        drop(held);
        writer.await.unwrap().unwrap();
        assert!(read_back(&path, "cn=bob").await.is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_search_ignores_held_lock() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ldapdb.json");
        let reader = FileBackend::with_snapshot(&path);
        let writer = FileBackend::with_snapshot(&path);

        reader
            .add("cn=bob,dc=example", attrs(&[("cn", &["bob"])]))
            .await
            .unwrap();
        writer
            .add("cn=carol,dc=example", attrs(&[("cn", &["carol"])]))
            .await
            .unwrap();

        // Another "process" is mid-transaction
        let held = FileLock::acquire(reader.lock_path()).unwrap();

        let mut results = SearchResults::new();
        tokio::time::timeout(
            Duration::from_secs(5),
            reader.search("dc=example", Scope::WholeSubtree, &Filter::Any, &mut results),
        )
        .await
        .expect("search blocked on the write lock")
        .unwrap();
        assert_eq!(
            results.dns(),
            vec!["cn=bob,dc=example", "cn=carol,dc=example"]
        );
        drop(held);
    }

    #[tokio::test]
    async fn test_open_reports_corrupt_snapshot() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ldapdb.json");
        std::fs::write(&path, "{broken").unwrap();

        let config = BackendConfig {
            snapshot_path: path,
            ..BackendConfig::default()
        };
        let err = FileBackend::open(&config).err().unwrap();
        assert!(matches!(err, Error::Snapshot(_)));
    }
}
