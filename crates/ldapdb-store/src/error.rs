//! Store error types

use thiserror::Error;

/// Error type for snapshot, cache and lock operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to lock {path}: {errno}")]
    Lock { path: String, errno: nix::errno::Errno },
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for ldapdb_common::Error {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Io(e) => Self::Io(e),
            StoreError::Json(e) => Self::Snapshot(e.to_string()),
            e @ StoreError::Lock { .. } => Self::Lock(e.to_string()),
        }
    }
}
