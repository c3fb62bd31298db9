//! ldapdb Backend - directory operations for the protocol engine
//!
//! This crate answers search, add, delete and modify requests against a
//! directory. Two variants share the same operation semantics:
//! [`MemoryBackend`] for a single process holding the directory in RAM and
//! [`FileBackend`] for independent worker processes coordinating through
//! the snapshot and lock files.

pub mod backend;
pub mod file;
pub mod filter;
pub mod memory;
pub mod ops;
pub mod search;

use ldapdb_common::Result;
use ldapdb_common::config::{BackendConfig, BackendMode};
use std::sync::Arc;

// Re-exports
pub use backend::{Backend, Modification, ResultSink, SearchResults};
pub use file::FileBackend;
pub use filter::{Filter, FilterEvaluator};
pub use memory::MemoryBackend;

/// Build the backend selected by `config`
pub fn open_backend(config: &BackendConfig) -> Result<Arc<dyn Backend>> {
    match config.mode {
        BackendMode::Memory => Ok(Arc::new(MemoryBackend::open(config.snapshot_path.clone())?)),
        BackendMode::File => Ok(Arc::new(FileBackend::open(config)?)),
    }
}
