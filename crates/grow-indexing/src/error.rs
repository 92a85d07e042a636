//! Error types for indexing and batch jobs.

use grow_storage::StorageError;
use thiserror::Error;

/// Errors that can occur while deriving search fields or running jobs
#[derive(Error, Debug)]
pub enum IndexingError {
    /// Storage operation failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// JSON encoding/decoding errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A single record could not be transformed
    #[error("Transform error: {0}")]
    Transform(String),

    /// Job configuration rejected
    #[error("Invalid job config: {0}")]
    InvalidConfig(String),
}

impl From<serde_json::Error> for IndexingError {
    fn from(err: serde_json::Error) -> Self {
        IndexingError::Serialization(err.to_string())
    }
}
