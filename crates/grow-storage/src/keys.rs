//! Document addressing.
//!
//! A document path is `{collection}/{id}`. The id may itself contain `/`
//! (lease documents live at `jobs/locks/<jobName>`), so only the first
//! separator splits collection from id.

use std::fmt;

use crate::error::StorageError;

/// Collection holding post documents
pub const COLLECTION_POSTS: &str = "posts";

/// Collection holding job bookkeeping documents
pub const COLLECTION_JOBS: &str = "jobs";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocKey {
    pub collection: String,
    pub id: String,
}

impl DocKey {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }

    pub fn post(id: impl Into<String>) -> Self {
        Self::new(COLLECTION_POSTS, id)
    }

    /// Lease document for a job: `jobs/locks/<jobName>`
    pub fn lock(job_name: &str) -> Self {
        Self::new(COLLECTION_JOBS, format!("locks/{job_name}"))
    }

    /// Parse `collection/id`.
    pub fn parse(path: &str) -> Result<Self, StorageError> {
        match path.split_once('/') {
            Some((collection, id)) if !collection.is_empty() && !id.is_empty() => {
                Ok(Self::new(collection, id))
            }
            _ => Err(StorageError::Key(format!("Invalid document path: {path}"))),
        }
    }

    /// Encode the id for storage inside the collection's column family
    pub fn to_bytes(&self) -> Vec<u8> {
        self.id.as_bytes().to_vec()
    }

    /// Decode an id read back from a collection's column family
    pub fn from_bytes(collection: &str, bytes: &[u8]) -> Result<Self, StorageError> {
        let id = std::str::from_utf8(bytes)
            .map_err(|e| StorageError::Key(format!("Invalid UTF-8: {e}")))?;
        Ok(Self::new(collection, id))
    }
}

impl fmt::Display for DocKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}
