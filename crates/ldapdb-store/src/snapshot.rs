//! Snapshot file codec.
//!
//! The directory is stored as one JSON document. Readers parse the whole
//! file; writers produce a complete temporary file next to the target and
//! rename it into place, so a reader only ever sees a whole snapshot.

use crate::directory::Directory;
use crate::error::StoreResult;
use std::fs::{File, Metadata, Permissions};
use std::io::{BufWriter, ErrorKind, Read, Write};
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::Path;

/// Identity and modification time of a snapshot file.
///
/// Every persist creates a new inode, so a changed token means some
/// process has replaced the snapshot since it was last read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FreshnessToken {
    dev: u64,
    ino: u64,
    mtime: i64,
    mtime_nsec: i64,
}

impl FreshnessToken {
    /// Token for the file described by `meta`
    #[must_use]
    pub fn from_metadata(meta: &Metadata) -> Self {
        Self {
            dev: meta.dev(),
            ino: meta.ino(),
            mtime: meta.mtime(),
            mtime_nsec: meta.mtime_nsec(),
        }
    }

    /// Token of the file currently at `path`, `None` if there is none
    pub fn probe(path: &Path) -> StoreResult<Option<Self>> {
        match std::fs::metadata(path) {
            Ok(meta) => Ok(Some(Self::from_metadata(&meta))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// An open snapshot file and its token.
///
/// Keeping the handle open keeps the inode allocated after the path has
/// been replaced, so no later snapshot can be given the same identity.
#[derive(Debug)]
pub struct SnapshotFile {
    _file: File,
    token: FreshnessToken,
}

impl SnapshotFile {
    /// Token of this file
    #[must_use]
    pub const fn token(&self) -> FreshnessToken {
        self.token
    }
}

/// Read the snapshot at `path`.
///
/// Returns `None` when the file does not exist. The token comes from the
/// opened handle, so it describes exactly the bytes that were parsed even
/// if the path is replaced concurrently.
pub fn read(path: &Path) -> StoreResult<Option<(Directory, SnapshotFile)>> {
    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let token = FreshnessToken::from_metadata(&file.metadata()?);

    let mut content = String::new();
    file.read_to_string(&mut content)?;
    let directory = if content.trim().is_empty() {
        Directory::new()
    } else {
        serde_json::from_str(&content)?
    };
    Ok(Some((directory, SnapshotFile { _file: file, token })))
}

/// Atomically replace the snapshot at `path` with `directory`.
///
/// Returns the file now in place.
pub fn write(path: &Path, directory: &Directory) -> StoreResult<SnapshotFile> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let prefix = path
        .file_name()
        .map(|n| format!(".{}.", n.to_string_lossy()))
        .unwrap_or_else(|| ".snapshot.".to_string());
    let mut tmp = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".tmp")
        .permissions(Permissions::from_mode(0o644))
        .tempfile_in(parent)?;

    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        serde_json::to_writer_pretty(&mut writer, directory)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    let token = FreshnessToken::from_metadata(&tmp.as_file().metadata()?);

    // Dropping a NamedTempFile removes it, so a failed rename leaves nothing behind
    let file = tmp.persist(path).map_err(|e| e.error)?;
    Ok(SnapshotFile { _file: file, token })
}
