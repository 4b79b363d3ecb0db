//! Artifact and address cache
//!
//! Persists compiled artifacts and the deployed contract address in a cache
//! directory so later runs can reuse the deployment:
//!
//! ```text
//! cache/<Contract>.bin   hex bytecode text
//! cache/<Contract>.abi   ABI JSON bytes
//! cache/address          deployed address, no trailing newline
//! ```

use crate::compiler::CompiledArtifact;
use crate::storage::lock::CacheLock;
use alloy_primitives::Address;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default cache directory, relative to the working directory
pub const DEFAULT_CACHE_DIR: &str = "cache";

/// File name of the cached contract address
pub const ADDRESS_FILE: &str = "address";

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create cache directory {path:?}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("Failed to write {path:?}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("Failed to read {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("Cached address in {path:?} is not a valid address: {content:?}")]
    InvalidAddress { path: PathBuf, content: String },
    #[error("No cached artifacts for {0}; run `compile` first")]
    ArtifactsMissing(String),
    #[error("Cache is locked by another process ({0:?})")]
    Locked(PathBuf),
    #[error("Failed to lock cache ({path:?}): {source}")]
    Lock { path: PathBuf, source: io::Error },
    #[error("Cache directory {0:?} has no name to derive a lock file from")]
    UnnamedCacheDir(PathBuf),
}

/// What is currently in the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStatus {
    pub cache_dir: PathBuf,
    pub bytecode: bool,
    pub abi: bool,
    pub address: Option<Address>,
}

/// File-backed store for one contract's artifacts and deployed address
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    cache_dir: PathBuf,
    contract: String,
}

impl ArtifactStore {
    /// Create a store for `contract` under `cache_dir`.
    ///
    /// Nothing is touched on disk until the first write.
    pub fn new(cache_dir: impl Into<PathBuf>, contract: impl Into<String>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            contract: contract.into(),
        }
    }

    /// The cache directory
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Contract name the artifact files are named after
    pub fn contract(&self) -> &str {
        &self.contract
    }

    /// Path of the bytecode file
    pub fn bytecode_path(&self) -> PathBuf {
        self.cache_dir.join(format!("{}.bin", self.contract))
    }

    /// Path of the ABI file
    pub fn abi_path(&self) -> PathBuf {
        self.cache_dir.join(format!("{}.abi", self.contract))
    }

    /// Path of the address file
    pub fn address_path(&self) -> PathBuf {
        self.cache_dir.join(ADDRESS_FILE)
    }

    /// Path of the lock file guarding this cache: `<cache_dir>.lock`.
    ///
    /// Fails for paths such as `.` or `..` that end without a file name.
    pub fn lock_path(&self) -> Result<PathBuf, StorageError> {
        let name = self
            .cache_dir
            .file_name()
            .ok_or_else(|| StorageError::UnnamedCacheDir(self.cache_dir.clone()))?;
        let mut lock_name = name.to_os_string();
        lock_name.push(".lock");
        Ok(self.cache_dir.with_file_name(lock_name))
    }

    /// Create the cache directory if it does not exist
    pub fn ensure_dir(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.cache_dir).map_err(|source| StorageError::CreateDir {
            path: self.cache_dir.clone(),
            source,
        })
    }

    /// Write bytecode and ABI bytes to their fixed-name files.
    ///
    /// There is no rollback: if the ABI write fails, the bytecode file that
    /// was already written stays in place.
    pub fn save_artifacts(&self, bytecode: &str, abi: &[u8]) -> Result<(), StorageError> {
        self.ensure_dir()?;
        write_file(&self.bytecode_path(), bytecode.as_bytes())?;
        write_file(&self.abi_path(), abi)?;
        log::info!("Saved ABI and bytecode to {:?}", self.cache_dir);
        Ok(())
    }

    /// Persist a compiled artifact
    pub fn save_artifact(&self, artifact: &CompiledArtifact) -> Result<(), StorageError> {
        self.save_artifacts(&artifact.bytecode, &artifact.abi_json)
    }

    /// Load previously saved artifacts, byte-for-byte
    pub fn load_artifact(&self) -> Result<CompiledArtifact, StorageError> {
        let bin_path = self.bytecode_path();
        let abi_path = self.abi_path();

        let bytecode = match read_optional(&bin_path)? {
            Some(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            None => return Err(StorageError::ArtifactsMissing(self.contract.clone())),
        };
        let abi_json = read_optional(&abi_path)?
            .ok_or_else(|| StorageError::ArtifactsMissing(self.contract.clone()))?;

        Ok(CompiledArtifact::new(self.contract.clone(), bytecode, abi_json))
    }

    /// The cached deployment address, if any
    pub fn cached_address(&self) -> Result<Option<Address>, StorageError> {
        load_address(&self.address_path())
    }

    /// Record the deployment address, replacing any previous one
    pub fn save_address(&self, _lock: &CacheLock, address: &Address) -> Result<(), StorageError> {
        self.ensure_dir()?;
        save_address(&self.address_path(), address)?;
        log::info!("Saved contract address {} to cache", address);
        Ok(())
    }

    /// Drop the cached address so the next run deploys again.
    ///
    /// Returns whether an address was cached.
    pub fn clear_address(&self, _lock: &CacheLock) -> Result<bool, StorageError> {
        let path = self.address_path();
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StorageError::Write { path, source }),
        }
    }

    /// Acquire the exclusive cache lock, waiting for other holders
    pub async fn lock(&self) -> Result<CacheLock, StorageError> {
        let path = self.lock_path()?;
        let task_path = path.clone();
        tokio::task::spawn_blocking(move || CacheLock::acquire(&task_path))
            .await
            .map_err(|e| StorageError::Lock {
                path,
                source: io::Error::new(io::ErrorKind::Other, e),
            })?
    }

    /// Acquire the exclusive cache lock from synchronous code, blocking the
    /// current thread
    pub fn lock_blocking(&self) -> Result<CacheLock, StorageError> {
        CacheLock::acquire(&self.lock_path()?)
    }

    /// Acquire the exclusive cache lock without waiting
    pub fn try_lock(&self) -> Result<CacheLock, StorageError> {
        CacheLock::try_acquire(&self.lock_path()?)
    }

    /// Summarize what is on disk
    pub fn status(&self) -> Result<CacheStatus, StorageError> {
        Ok(CacheStatus {
            cache_dir: self.cache_dir.clone(),
            bytecode: self.bytecode_path().is_file(),
            abi: self.abi_path().is_file(),
            address: self.cached_address()?,
        })
    }
}

/// Read a cached address from `path`.
///
/// A missing file is `Ok(None)`. Any other read failure, or content that is
/// not an address, is an error: callers trust the cache, so corruption must
/// not turn into a silent redeploy.
pub fn load_address(path: &Path) -> Result<Option<Address>, StorageError> {
    let Some(bytes) = read_optional(path)? else {
        return Ok(None);
    };

    let content = String::from_utf8_lossy(&bytes);
    let trimmed = content.trim();
    trimmed
        .parse::<Address>()
        .map(Some)
        .map_err(|_| StorageError::InvalidAddress {
            path: path.to_path_buf(),
            content: trimmed.to_string(),
        })
}

/// Write `address` to `path` as checksummed hex without a trailing newline
pub fn save_address(path: &Path, address: &Address) -> Result<(), StorageError> {
    // Write to a temporary file first so readers never see a partial address
    let temp_path = path.with_extension("tmp");
    write_file(&temp_path, address.to_checksum(None).as_bytes())?;
    fs::rename(&temp_path, path).map_err(|source| StorageError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn write_file(path: &Path, data: &[u8]) -> Result<(), StorageError> {
    fs::write(path, data).map_err(|source| StorageError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, StorageError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(StorageError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}
