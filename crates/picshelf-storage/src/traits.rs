//! Storage abstraction trait
//!
//! This module defines the Storage trait that the upload path and the reconciler
//! program against.

use async_trait::async_trait;
use std::pin::Pin;
use thiserror::Error;
use tokio::io::AsyncRead;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Object already exists: {0}")]
    AlreadyExists(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("List failed: {0}")]
    ListFailed(String),

    #[error("Invalid storage name: {0}")]
    InvalidName(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Byte source consumed by [`Storage::put_stream`].
pub type BlobReader = Pin<Box<dyn AsyncRead + Send + Unpin>>;

/// Flat, name-addressed blob storage.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Write a new object from a reader and return the number of bytes written.
    ///
    /// Objects are created exclusively: if `name` already exists the call fails with
    /// [`StorageError::AlreadyExists`] and the existing object is left untouched. A failed
    /// write does not leave a partial object behind.
    async fn put_stream(&self, name: &str, reader: BlobReader) -> StorageResult<u64>;

    /// List the names of all objects in the storage root.
    async fn list(&self) -> StorageResult<Vec<String>>;

    /// Delete an object. Deleting a missing object is not an error.
    async fn delete(&self, name: &str) -> StorageResult<()>;
}
