//! Key/value text-blob storage capability.

use std::fmt;

/// Why a storage operation did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The storage capability does not exist on this host (probe failed).
    Unavailable(String),
    /// The capability exists but this operation failed.
    Failed(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(msg) => write!(f, "storage unavailable: {msg}"),
            Self::Failed(msg) => write!(f, "storage operation failed: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Byte-level storage primitives, modeled as whole text blobs addressed by key.
pub trait BlobStore {
    /// Check that the store can be used at all.
    fn probe(&mut self) -> Result<(), StoreError>;
    /// Read the blob for `key`; `Ok(None)` when nothing has been stored yet.
    fn read(&mut self, key: &str) -> Result<Option<String>, StoreError>;
    /// Replace the blob for `key`.
    fn write(&mut self, key: &str, blob: &str) -> Result<(), StoreError>;
}

impl<T: BlobStore + ?Sized> BlobStore for Box<T> {
    fn probe(&mut self) -> Result<(), StoreError> {
        (**self).probe()
    }
    fn read(&mut self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).read(key)
    }
    fn write(&mut self, key: &str, blob: &str) -> Result<(), StoreError> {
        (**self).write(key, blob)
    }
}
