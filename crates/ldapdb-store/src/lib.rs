//! ldapdb Store - snapshot-backed directory storage
//!
//! This crate implements the entry model and the discipline that lets
//! independent worker processes share one on-disk directory: a per-process
//! cache revalidated against the snapshot's freshness token, atomic
//! whole-file persistence, and write transactions serialized by a lock
//! file.

pub mod directory;
pub mod entry;
pub mod error;
pub mod lock;
pub mod snapshot;
pub mod store;
pub mod txn;

// Re-exports
pub use directory::Directory;
pub use entry::{Attributes, Entry};
pub use error::{StoreError, StoreResult};
pub use lock::FileLock;
pub use snapshot::FreshnessToken;
pub use store::DirectoryStore;
pub use txn::WriteCoordinator;
