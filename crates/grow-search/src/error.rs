//! Search error types.

use grow_storage::StorageError;
use thiserror::Error;

/// Errors that can occur during search operations.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Underlying store query failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Result encoding failed
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for SearchError {
    fn from(err: serde_json::Error) -> Self {
        SearchError::Serialization(err.to_string())
    }
}
