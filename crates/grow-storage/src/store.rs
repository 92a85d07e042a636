//! The document store seam.
//!
//! Everything above the storage layer talks to `dyn DocumentStore`. The
//! only coordination primitive is single-document atomic read-modify-write
//! ([`DocumentStore::compare_and_set`] / [`DocumentStore::transaction`]);
//! there are no cross-document locks.

use serde_json::Value;

use crate::document::{DocBatch, Document, TxnWrite};
use crate::error::StorageError;
use crate::keys::DocKey;
use crate::query::DocQuery;

/// Retry budget for the optimistic default [`DocumentStore::transaction`].
pub const MAX_TXN_ATTEMPTS: usize = 16;

/// Transaction body: sees the current bytes (or `None`), decides the write.
pub type TxnFn<'a> = dyn FnMut(Option<&[u8]>) -> Result<TxnWrite, StorageError> + 'a;

pub trait DocumentStore: Send + Sync {
    /// Current bytes of a document, `None` when absent.
    fn get(&self, key: &DocKey) -> Result<Option<Vec<u8>>, StorageError>;

    /// Atomically replace `expected` with `new` (`None` meaning absent on
    /// either side). Returns false when the current value differs.
    fn compare_and_set(
        &self,
        key: &DocKey,
        expected: Option<&[u8]>,
        new: Option<&[u8]>,
    ) -> Result<bool, StorageError>;

    /// Up to `limit` documents ordered by id, strictly after `after`.
    fn scan_collection(
        &self,
        collection: &str,
        after: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Document>, StorageError>;

    fn query(&self, query: &DocQuery) -> Result<Vec<Document>, StorageError>;

    /// Apply all operations atomically. Batches over the atomic-write limit
    /// are rejected; a merge onto a missing document fails the whole batch.
    fn commit(&self, batch: DocBatch) -> Result<(), StorageError>;

    fn delete(&self, key: &DocKey) -> Result<(), StorageError> {
        let mut batch = DocBatch::new();
        batch.delete(key.clone());
        self.commit(batch)
    }

    /// Single-document read-modify-write.
    ///
    /// The default runs `body` against a snapshot and publishes the decision
    /// with [`compare_and_set`](Self::compare_and_set), re-running `body`
    /// when another writer got there first.
    fn transaction(&self, key: &DocKey, body: &mut TxnFn<'_>) -> Result<(), StorageError> {
        for _ in 0..MAX_TXN_ATTEMPTS {
            let current = self.get(key)?;
            let next = match body(current.as_deref())? {
                TxnWrite::Keep => return Ok(()),
                TxnWrite::Put(bytes) => Some(bytes),
                TxnWrite::Delete => None,
            };
            if self.compare_and_set(key, current.as_deref(), next.as_deref())? {
                return Ok(());
            }
        }
        Err(StorageError::Contention(key.to_string()))
    }

    fn get_document(&self, key: &DocKey) -> Result<Option<Document>, StorageError> {
        self.get(key)?
            .map(|bytes| Document::from_bytes(key.id.clone(), &bytes))
            .transpose()
    }

    fn set_document(&self, key: &DocKey, data: &Value) -> Result<(), StorageError> {
        let mut batch = DocBatch::new();
        batch.set(key.clone(), data.clone());
        self.commit(batch)
    }

    fn merge_document(&self, key: &DocKey, patch: &Value) -> Result<(), StorageError> {
        let mut batch = DocBatch::new();
        batch.merge(key.clone(), patch.clone());
        self.commit(batch)
    }
}
