//! Cache storage for compiled artifacts and deployed addresses

pub mod cache;
pub mod lock;

pub use cache::{
    load_address, save_address, ArtifactStore, CacheStatus, StorageError, ADDRESS_FILE,
    DEFAULT_CACHE_DIR,
};
pub use lock::CacheLock;
