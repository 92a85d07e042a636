//! Storage layer error types.

use thiserror::Error;

/// Errors that can occur in the storage layer
#[derive(Error, Debug)]
pub enum StorageError {
    /// RocksDB operation failed
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),

    /// Column family not found
    #[error("Column family not found: {0}")]
    ColumnFamilyNotFound(String),

    /// Document key encoding/decoding error
    #[error("Key error: {0}")]
    Key(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Document not found
    #[error("Document not found: {0}")]
    NotFound(String),

    /// Batch exceeds the atomic write limit
    #[error("Batch too large: {size} operations (limit {limit})")]
    BatchTooLarge { size: usize, limit: usize },

    /// Optimistic transaction kept losing the race
    #[error("Transaction contention on {0}")]
    Contention(String),

    /// In-memory store lock poisoned by a panicking writer
    #[error("Store lock poisoned")]
    Poisoned,
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}
