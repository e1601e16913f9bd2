//! Persistent key-value backends.
//!
//! The stores only ever need three operations on a string-keyed,
//! string-valued store. Backends are treated as unreliable: any call may
//! fail and callers decide how to degrade.

mod file;
mod memory;

pub use file::FileBackend;
pub use memory::MemoryBackend;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Quota exceeded for key {key}: {size} bytes")]
    QuotaExceeded { key: String, size: usize },

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, BackendError>;

/// A key-value store with `get`/`set`/`remove` semantics.
pub trait KeyValueBackend: Send + Sync {
    /// Read the value stored under `key`, `None` when absent.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}
