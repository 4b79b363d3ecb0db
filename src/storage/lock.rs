//! Exclusive lock over the cache directory
//!
//! Serializes the read-decide-write sequence across processes sharing one
//! cache. The lock is an advisory `flock` on a sibling `<cache>.lock` file
//! and is released when the guard is dropped, on every exit path.

use crate::storage::cache::StorageError;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

/// Held exclusive lock on a cache directory
#[derive(Debug)]
pub struct CacheLock {
    file: File,
    path: PathBuf,
}

impl CacheLock {
    /// Block until the lock at `path` is acquired
    pub fn acquire(path: &Path) -> Result<Self, StorageError> {
        let file = open_lock_file(path)?;
        log::debug!("Waiting for cache lock {:?}", path);
        file.lock_exclusive().map_err(|source| StorageError::Lock {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Acquired cache lock {:?}", path);

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Acquire the lock at `path`, failing immediately if another holder has it
    pub fn try_acquire(path: &Path) -> Result<Self, StorageError> {
        let file = open_lock_file(path)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Self {
                file,
                path: path.to_path_buf(),
            }),
            Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => {
                Err(StorageError::Locked(path.to_path_buf()))
            }
            Err(source) => Err(StorageError::Lock {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Path of the lock file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            log::warn!("Failed to release cache lock {:?}: {}", self.path, e);
        }
    }
}

fn open_lock_file(path: &Path) -> Result<File, StorageError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| StorageError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(path)
        .map_err(|source| StorageError::Lock {
            path: path.to_path_buf(),
            source,
        })
}
