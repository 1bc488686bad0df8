//! Filesystem primitives used to reconcile output locations
//!
//! All operations are blocking and run on the caller's thread. Symlinks are
//! never followed: a link is removed or replaced, not its target.

use crate::{Error, Result};
use std::fs;
use std::io;
use std::path::Path;

/// Outcome of [`ensure_directory`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryState {
    /// The path was already a directory; nothing changed
    AlreadyExisted,
    /// The directory (and any missing parents) had to be created
    Created,
}

impl DirectoryState {
    /// Whether the directory was created by this call
    #[must_use]
    pub fn was_created(self) -> bool {
        matches!(self, Self::Created)
    }
}

/// Make sure `path` is an existing directory.
///
/// Anything at `path` that is not a real directory, including a symlink to
/// one, is deleted first. Missing parents are created. Only the call that
/// actually creates `path` reports [`DirectoryState::Created`], even when
/// several threads race on the same path.
pub fn ensure_directory(path: &Path) -> Result<DirectoryState> {
    match fs::symlink_metadata(path) {
        Ok(metadata) if metadata.is_dir() => return Ok(DirectoryState::AlreadyExisted),
        Ok(_) => {
            tracing::debug!(path = %path.display(), "Replacing non-directory with directory");
            force_delete(path)?;
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(Error::io(e, path, "stat")),
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::io(e, path, "create_dir_all"))?;
    }
    match fs::create_dir(path) {
        Ok(()) => Ok(DirectoryState::Created),
        // Lost a race with another writer that created the same directory
        Err(e)
            if e.kind() == io::ErrorKind::AlreadyExists
                && fs::symlink_metadata(path).is_ok_and(|m| m.is_dir()) =>
        {
            Ok(DirectoryState::AlreadyExisted)
        }
        Err(e) => Err(Error::io(e, path, "create_dir")),
    }
}

/// Delete every child of the directory at `path`, keeping `path` itself.
pub fn clean_directory(path: &Path) -> Result<()> {
    let entries = fs::read_dir(path).map_err(|e| Error::io(e, path, "read_dir"))?;
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(e, path, "read_dir"))?;
        force_delete(&entry.path())?;
    }
    Ok(())
}

/// Delete whatever is at `path`: a file, a symlink, or a whole directory tree.
///
/// A path that is already gone counts as deleted.
pub fn force_delete(path: &Path) -> Result<()> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(Error::io(e, path, "stat")),
    };

    let (result, operation) = if metadata.is_dir() {
        (fs::remove_dir_all(path), "remove_dir_all")
    } else {
        (fs::remove_file(path), "remove_file")
    };

    match result {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io(e, path, operation)),
    }
}

/// Whether anything, including a dangling symlink, exists at `path`.
pub fn exists_no_follow(path: &Path) -> Result<bool> {
    match fs::symlink_metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::io(e, path, "stat")),
    }
}
